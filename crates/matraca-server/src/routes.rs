use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use matraca_core::{WebhookOutcome, jid};
use matraca_db::{InboxDb, NewMessage, TicketState};
use matraca_gateway::EvolutionClient;
use matraca_ingest::{ConnectionStore, Importer, WebhookRouter};

pub struct AppState {
    pub db: Arc<InboxDb>,
    pub gateway: Arc<EvolutionClient>,
    pub router: WebhookRouter,
    pub importer: Importer,
    pub store: Arc<ConnectionStore>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook_root))
        .route("/webhook/{event}", post(webhook_event))
        .route("/api/chats", get(list_chats))
        .route("/api/chats/{contact_id}/messages", get(list_messages))
        .route("/api/chats/{contact_id}/read", post(mark_read))
        .route("/api/chats/{contact_id}/ticket-state", post(set_ticket_state))
        .route("/api/messages", get(messages_since))
        .route("/api/connection", get(connection_status))
        .route("/api/send", post(send_text))
        .route("/api/contacts/merge", post(merge_contacts))
        .route("/api/import/contacts", post(import_contacts))
        .route("/api/import/history", post(import_history))
        .with_state(state)
}

// ── Webhook ────────────────────────────────────────────────────────

// The body is parsed by hand so a malformed payload still gets a 200
// acknowledgement instead of an extractor rejection.
async fn webhook_root(State(state): State<Arc<AppState>>, body: Bytes) -> Json<Value> {
    let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    ack(state.router.handle(None, &value).await)
}

async fn webhook_event(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
    body: Bytes,
) -> Json<Value> {
    let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    ack(state.router.handle(Some(&event), &value).await)
}

fn ack(outcome: WebhookOutcome) -> Json<Value> {
    Json(json!({ "status": outcome.as_str() }))
}

// ── Polling reads ──────────────────────────────────────────────────

async fn list_chats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let chats = state.db.chat_summaries().await?;
    Ok(Json(json!({ "chats": chats })))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let messages = state.db.get_messages(contact_id, page.limit, page.offset).await?;
    Ok(Json(json!({ "messages": messages })))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let updated = state.db.mark_read(contact_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

#[derive(Debug, Deserialize)]
struct TicketStateRequest {
    state: TicketState,
}

/// Helpdesk linkage tag for a contact, set by the ticketing side.
async fn set_ticket_state(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
    Json(request): Json<TicketStateRequest>,
) -> Result<Json<Value>, ApiError> {
    state.db.set_ticket_state(contact_id, request.state).await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
struct SinceQuery {
    contact_id: i64,
    #[serde(default)]
    since: i64,
}

/// The polling clients' delta query: new messages for the active
/// conversation plus refreshed chat summaries.
async fn messages_since(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<Value>, ApiError> {
    let messages = state.db.messages_since(query.contact_id, query.since).await?;
    let chats = state.db.chat_summaries().await?;
    Ok(Json(json!({ "messages": messages, "chats": chats })))
}

async fn connection_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    // Cache miss falls through to the gateway so a freshly started
    // server answers correctly before the first webhook arrives.
    let raw_state = match state.store.raw_state() {
        Some(raw) => raw,
        None => match state.gateway.connection_state().await {
            Ok(raw) => {
                state.store.record_raw_state(&raw);
                if raw == "open" {
                    state.store.mark_connected();
                }
                raw
            }
            Err(e) => {
                warn!(error = %e, "Connection state probe failed");
                "unknown".to_string()
            }
        },
    };

    Json(json!({
        "connected": state.store.connection_status().is_some(),
        "state": raw_state,
        "qr_code": state.store.qr_code(),
    }))
}

// ── Outbound / maintenance ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SendRequest {
    number: String,
    text: String,
}

async fn send_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> Result<Json<Value>, ApiError> {
    let message_id = state
        .gateway
        .send_text(&request.number, &request.text)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;

    let remote_jid = if request.number.contains('@') {
        request.number.clone()
    } else {
        format!("{}{}", request.number, jid::USER_SUFFIX)
    };

    let contact = state.db.find_or_create_contact(&remote_jid, None).await?;
    state
        .db
        .insert_message(NewMessage {
            gateway_message_id: &message_id,
            contact_id: contact.id,
            is_from_me: true,
            body: &request.text,
            media_url: None,
            media_kind: None,
            sent_at: epoch_now(),
            is_read: true,
            is_automated: false,
        })
        .await?;

    Ok(Json(json!({ "message_id": message_id })))
}

async fn merge_contacts(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let report = state.db.merge_shadow_contacts().await?;
    Ok(Json(json!(report)))
}

async fn import_contacts(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let imported = state
        .importer
        .import_contacts()
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;
    Ok(Json(json!({ "imported": imported })))
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    remote_jid: Option<String>,
    since: Option<i64>,
}

async fn import_history(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<Value>, ApiError> {
    let stats = match &request.remote_jid {
        Some(jid) => state.importer.import_history(jid, request.since).await,
        None => state.importer.import_all_history(request.since).await,
    }
    .map_err(|e| ApiError::bad_gateway(e.to_string()))?;

    Ok(Json(json!(stats)))
}

// ── Errors ─────────────────────────────────────────────────────────

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_gateway(message: String) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message,
        }
    }
}

impl From<matraca_db::DbError> for ApiError {
    fn from(e: matraca_db::DbError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        warn!(status = %self.status, "{}", self.message);
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn epoch_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
