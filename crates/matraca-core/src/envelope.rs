use serde::Deserialize;

use crate::kind::MessageKind;

/// Raw message payload delivered by a `messages.upsert` webhook event.
///
/// The gateway sends these either bare or wrapped in an
/// `{event, instance, data}` object; the router unwraps `data` before
/// deserializing. Only the fields the pipeline consumes are modeled,
/// everything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub key: EnvelopeKey,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub message: Option<MessageContent>,
    #[serde(default)]
    pub message_timestamp: Option<i64>,
}

impl MessageEnvelope {
    /// Content sub-object, or an empty one when the event carried none
    /// (protocol messages, reactions).
    pub fn content(&self) -> MessageContent {
        self.message.clone().unwrap_or_default()
    }
}

/// Routing metadata for a message: who, which chat, which direction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeKey {
    #[serde(default)]
    pub remote_jid: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub id: String,
}

/// The kind-specific sub-keys of a message payload. Exactly one is
/// normally present; plain text uses `conversation` or the extended
/// variant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageContent {
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedText>,
    pub image_message: Option<MediaContent>,
    pub video_message: Option<MediaContent>,
    pub audio_message: Option<MediaContent>,
    pub document_message: Option<MediaContent>,
    pub sticker_message: Option<MediaContent>,
}

impl MessageContent {
    /// The media sub-object matching `kind`, when present.
    pub fn media_for(&self, kind: MessageKind) -> Option<&MediaContent> {
        match kind {
            MessageKind::Image => self.image_message.as_ref(),
            MessageKind::Video => self.video_message.as_ref(),
            MessageKind::Audio => self.audio_message.as_ref(),
            MessageKind::Document => self.document_message.as_ref(),
            MessageKind::Sticker => self.sticker_message.as_ref(),
            MessageKind::Text => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedText {
    pub text: Option<String>,
}

/// Common shape of the media sub-keys (`imageMessage`, `videoMessage`,
/// ...). `base64` is only present when the webhook is configured to
/// inline media.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaContent {
    pub caption: Option<String>,
    pub mimetype: Option<String>,
    pub file_name: Option<String>,
    pub base64: Option<String>,
}
