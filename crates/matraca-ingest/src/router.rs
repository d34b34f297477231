use std::sync::Arc;

use serde_json::Value;

use matraca_core::{EventFamily, MessageEnvelope, WebhookOutcome, jid, resolve_event_name};
use matraca_db::InboxDb;

use crate::cache::ConnectionStore;
use crate::media::MediaResolver;
use crate::pipeline::{PersistResult, persist_envelope};

/// Top-level webhook dispatcher. One delivery per call; every path
/// ends in an acknowledged outcome, never an error — the HTTP layer
/// always answers 200 so the gateway does not retry-storm.
pub struct WebhookRouter {
    db: Arc<InboxDb>,
    media: MediaResolver,
    state: Arc<ConnectionStore>,
}

impl WebhookRouter {
    pub fn new(db: Arc<InboxDb>, media: MediaResolver, state: Arc<ConnectionStore>) -> Self {
        Self { db, media, state }
    }

    pub async fn handle(&self, path_event: Option<&str>, body: &Value) -> WebhookOutcome {
        let name = resolve_event_name(path_event, body);

        match EventFamily::parse(&name) {
            EventFamily::MessagesUpsert => self.handle_message_upsert(body).await,
            EventFamily::ConnectionUpdate => self.handle_connection_update(body),
            EventFamily::QrcodeUpdated => self.handle_qr_update(body),
            EventFamily::Unknown => {
                tracing::debug!(event = %name, "Ignoring unrecognized webhook event");
                WebhookOutcome::Ignored
            }
        }
    }

    async fn handle_message_upsert(&self, body: &Value) -> WebhookOutcome {
        let data = body.get("data").unwrap_or(body);

        let envelope: MessageEnvelope = match serde_json::from_value(data.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed message payload");
                return WebhookOutcome::NoData;
            }
        };

        if envelope.key.id.is_empty() {
            return WebhookOutcome::NoData;
        }

        let remote = envelope.key.remote_jid.as_str();
        if remote.is_empty() || jid::is_group_jid(remote) {
            return WebhookOutcome::IgnoredGroup;
        }

        // Fast-path for redelivered events; the unique index on the
        // insert below is the authoritative guard.
        match self.db.message_exists(&envelope.key.id).await {
            Ok(true) => return WebhookOutcome::MessageExists,
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "Dedup pre-check failed"),
        }

        match persist_envelope(&self.db, Some(&self.media), &envelope).await {
            Ok(PersistResult::Saved) => WebhookOutcome::MessageSaved,
            Ok(PersistResult::Duplicate) => WebhookOutcome::MessageExists,
            Err(e) => {
                tracing::error!(remote, error = %e, "Failed to persist message");
                WebhookOutcome::InvalidContact
            }
        }
    }

    fn handle_connection_update(&self, body: &Value) -> WebhookOutcome {
        let data = body.get("data").unwrap_or(body);
        let state = data
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        self.state.record_raw_state(state);

        match state {
            "open" => self.state.mark_connected(),
            "close" | "offline" | "disconnected" => self.state.mark_disconnected(),
            _ => {}
        }

        tracing::info!(state, "Connection state updated");
        WebhookOutcome::ConnectionUpdated
    }

    fn handle_qr_update(&self, body: &Value) -> WebhookOutcome {
        let data = body.get("data").unwrap_or(body);

        let raw = data
            .as_str()
            .or_else(|| data.get("base64").and_then(Value::as_str))
            .or_else(|| {
                data.get("qrcode")
                    .and_then(|q| q.get("base64"))
                    .and_then(Value::as_str)
            });

        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return WebhookOutcome::NoData;
        };

        let data_uri = if raw.starts_with("data:") {
            raw.to_string()
        } else {
            format!("data:image/png;base64,{raw}")
        };

        self.state.store_qr(data_uri);
        WebhookOutcome::QrcodeUpdated
    }
}
