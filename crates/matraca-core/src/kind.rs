use serde::{Deserialize, Serialize};

/// Content classification of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
            MessageKind::Document => "document",
            MessageKind::Sticker => "sticker",
        }
    }

    pub fn is_media(&self) -> bool {
        !matches!(self, MessageKind::Text)
    }

    /// Fallback file extension when neither the filename nor the
    /// mimetype yields one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            MessageKind::Image => "jpg",
            MessageKind::Video => "mp4",
            MessageKind::Audio => "ogg",
            MessageKind::Sticker => "webp",
            MessageKind::Document | MessageKind::Text => "bin",
        }
    }
}
