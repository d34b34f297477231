use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use matraca_core::{MediaPayload, MediaSource, MessageEnvelope, MessageKind};

use crate::error::{GatewayError, Result};
use crate::types::{RemoteChat, RemoteContact};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Page size and hard page cap for the message-history fetch loop.
const PAGE_SIZE: usize = 50;
const MAX_PAGES: usize = 10;

/// Thin client for the Evolution API, scoped to a single named
/// instance and authenticated with a static API key header.
pub struct EvolutionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    instance: String,
}

impl EvolutionClient {
    pub fn new(base_url: &str, api_key: &str, instance: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            instance: instance.to_string(),
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, path, self.instance)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.url(path))
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await?;
        Self::decode(path, response).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let response = self
            .http
            .get(self.url(path))
            .header("apikey", &self.api_key)
            .send()
            .await?;
        Self::decode(path, response).await
    }

    async fn decode(path: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(path, status = status.as_u16(), %body, "Gateway call failed");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    /// Send a plain text message. Returns the gateway's message id.
    pub async fn send_text(&self, number: &str, text: &str) -> Result<String> {
        let value = self
            .post("message/sendText", &json!({ "number": number, "text": text }))
            .await?;
        Self::message_id(&value)
    }

    /// Send a media message from base64 content.
    pub async fn send_media(
        &self,
        number: &str,
        kind: MessageKind,
        base64: &str,
        mimetype: &str,
        caption: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<String> {
        let value = self
            .post(
                "message/sendMedia",
                &json!({
                    "number": number,
                    "mediatype": kind.as_str(),
                    "mimetype": mimetype,
                    "media": base64,
                    "caption": caption,
                    "fileName": file_name,
                }),
            )
            .await?;
        Self::message_id(&value)
    }

    fn message_id(value: &Value) -> Result<String> {
        value
            .get("key")
            .and_then(|k| k.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GatewayError::InvalidResponse("missing key.id".to_string()))
    }

    /// Download a message's media as base64. `Ok(None)` when the
    /// gateway has nothing for the id.
    pub async fn download_media(
        &self,
        message_id: &str,
        kind: MessageKind,
    ) -> Result<Option<MediaPayload>> {
        let value = self
            .post(
                "chat/getBase64FromMediaMessage",
                &json!({
                    "message": { "key": { "id": message_id } },
                    "convertToMp4": kind == MessageKind::Video,
                }),
            )
            .await?;

        let Some(base64) = value.get("base64").and_then(Value::as_str) else {
            return Ok(None);
        };
        if base64.is_empty() {
            return Ok(None);
        }

        Ok(Some(MediaPayload {
            base64: base64.to_string(),
            mimetype: value
                .get("mimetype")
                .and_then(Value::as_str)
                .map(str::to_string),
        }))
    }

    pub async fn find_contacts(&self) -> Result<Vec<RemoteContact>> {
        let value = self.post("chat/findContacts", &json!({})).await?;
        Ok(Self::records(value)
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect())
    }

    pub async fn find_chats(&self) -> Result<Vec<RemoteChat>> {
        let value = self.post("chat/findChats", &json!({})).await?;
        Ok(Self::records(value)
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect())
    }

    /// Fetch message history for a chat, newest first, page by page.
    /// Stops on a short page, on the hard page cap, or once records
    /// fall behind `since`.
    pub async fn fetch_messages(
        &self,
        remote_jid: &str,
        since: Option<i64>,
    ) -> Result<Vec<MessageEnvelope>> {
        let mut envelopes = Vec::new();

        for page in 1..=MAX_PAGES {
            let value = self
                .post(
                    "chat/findMessages",
                    &json!({
                        "where": { "key": { "remoteJid": remote_jid } },
                        "page": page,
                        "offset": PAGE_SIZE,
                    }),
                )
                .await?;

            let records = Self::records(value);
            let page_len = records.len();

            let mut exhausted = false;
            for record in records {
                let Ok(envelope) = serde_json::from_value::<MessageEnvelope>(record) else {
                    continue;
                };
                if let (Some(since), Some(ts)) = (since, envelope.message_timestamp) {
                    if ts <= since {
                        exhausted = true;
                        break;
                    }
                }
                envelopes.push(envelope);
            }

            if exhausted || page_len < PAGE_SIZE {
                break;
            }
        }

        Ok(envelopes)
    }

    /// Point the instance's webhook at `url` for the event families
    /// the pipeline consumes, with media inlined as base64.
    pub async fn register_webhook(&self, url: &str) -> Result<()> {
        self.post(
            "webhook/set",
            &json!({
                "webhook": {
                    "enabled": true,
                    "url": url,
                    "base64": true,
                    "events": ["MESSAGES_UPSERT", "CONNECTION_UPDATE", "QRCODE_UPDATED"],
                }
            }),
        )
        .await?;
        Ok(())
    }

    /// Raw connection state string for the instance.
    pub async fn connection_state(&self) -> Result<String> {
        let value = self.get("instance/connectionState").await?;
        Ok(value
            .get("instance")
            .and_then(|i| i.get("state"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    /// List payloads come either bare or wrapped in
    /// `{messages: {records: [...]}}` depending on gateway version.
    fn records(value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            Value::Object(mut map) => {
                let nested = map
                    .remove("messages")
                    .and_then(|m| m.get("records").cloned())
                    .or_else(|| map.remove("records"));
                match nested {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Read-path sentinel boundary: media fetch failures become `None`,
/// logged here, and never propagate to the webhook handler.
#[async_trait]
impl MediaSource for EvolutionClient {
    async fn fetch_media(&self, message_id: &str, kind: MessageKind) -> Option<MediaPayload> {
        match self.download_media(message_id, kind).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(message_id, error = %e, "Media download failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> EvolutionClient {
        EvolutionClient::new(base, "test-key", "test").unwrap()
    }

    #[tokio::test]
    async fn download_media_returns_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/getBase64FromMediaMessage/test")
            .match_header("apikey", "test-key")
            .with_status(200)
            .with_body(r#"{"base64": "AAAA", "mimetype": "image/png"}"#)
            .create_async()
            .await;

        let payload = client(&server.url())
            .download_media("MSG1", MessageKind::Image)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(payload.base64, "AAAA");
        assert_eq!(payload.mimetype.as_deref(), Some("image/png"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn media_source_swallows_gateway_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/getBase64FromMediaMessage/test")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let fetched = client(&server.url()).fetch_media("MSG1", MessageKind::Audio).await;
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn send_text_extracts_message_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/message/sendText/test")
            .with_status(201)
            .with_body(r#"{"key": {"id": "ABC123"}}"#)
            .create_async()
            .await;

        let id = client(&server.url()).send_text("5215512345678", "hola").await.unwrap();
        assert_eq!(id, "ABC123");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/instance/connectionState/test")
            .with_status(401)
            .with_body(r#"{"error": "unauthorized"}"#)
            .create_async()
            .await;

        let err = client(&server.url()).connection_state().await.unwrap_err();
        match err {
            GatewayError::Status { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected error: {other}"),
        }
    }
}
