use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use matraca_core::{
    MediaPayload, MediaSource, MessageContent, MessageKind, resolve_extension, strip_data_uri,
};

use crate::storage::MediaStore;

/// Two-tier media resolution: inline base64 from the webhook payload
/// first, then a gateway download. Every failure mode downgrades to
/// "no media" so the message itself is still persisted.
pub struct MediaResolver {
    store: MediaStore,
    source: Arc<dyn MediaSource>,
}

impl MediaResolver {
    pub fn new(store: MediaStore, source: Arc<dyn MediaSource>) -> Self {
        Self { store, source }
    }

    pub async fn resolve(
        &self,
        message_id: &str,
        kind: MessageKind,
        content: &MessageContent,
    ) -> Option<String> {
        if !kind.is_media() {
            return None;
        }

        let media = content.media_for(kind);

        let inline = media.and_then(|m| m.base64.as_ref()).map(|b64| MediaPayload {
            base64: b64.clone(),
            mimetype: media.and_then(|m| m.mimetype.clone()),
        });

        let payload = match inline {
            Some(payload) => Some(payload),
            None => self.source.fetch_media(message_id, kind).await,
        };

        let Some(payload) = payload else {
            tracing::warn!(message_id, kind = kind.as_str(), "No media available for message");
            return None;
        };

        let bytes = match BASE64.decode(strip_data_uri(&payload.base64).trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(message_id, error = %e, "Media base64 decode failed");
                return None;
            }
        };

        let extension = resolve_extension(
            kind,
            payload.mimetype.as_deref(),
            media.and_then(|m| m.file_name.as_deref()),
        );

        match self.store.store(&bytes, &extension).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!(message_id, error = %e, "Failed to persist media");
                None
            }
        }
    }
}
