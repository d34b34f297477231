use crate::envelope::MessageContent;
use crate::kind::MessageKind;

/// Classify a message payload by its kind-specific sub-keys, in fixed
/// priority order. A payload with none of them is plain text.
pub fn classify(content: &MessageContent) -> MessageKind {
    if content.image_message.is_some() {
        MessageKind::Image
    } else if content.video_message.is_some() {
        MessageKind::Video
    } else if content.audio_message.is_some() {
        MessageKind::Audio
    } else if content.document_message.is_some() {
        MessageKind::Document
    } else if content.sticker_message.is_some() {
        MessageKind::Sticker
    } else {
        MessageKind::Text
    }
}

/// Display string for a message. Media kinds without a caption fall
/// back to a bracketed placeholder.
pub fn extract_body(content: &MessageContent, kind: MessageKind) -> String {
    match kind {
        MessageKind::Text => text_body(content),
        MessageKind::Image => caption_or(content, kind, "[Imagen]"),
        MessageKind::Video => caption_or(content, kind, "[Video]"),
        MessageKind::Audio => "[Audio]".to_string(),
        MessageKind::Sticker => "[Sticker]".to_string(),
        MessageKind::Document => {
            let name = content
                .document_message
                .as_ref()
                .and_then(|d| d.file_name.as_deref())
                .filter(|n| !n.is_empty())
                .unwrap_or("archivo");
            format!("[Documento: {}]", name)
        }
    }
}

fn text_body(content: &MessageContent) -> String {
    if let Some(text) = content.conversation.as_deref() {
        if !text.is_empty() {
            return text.to_string();
        }
    }
    content
        .extended_text_message
        .as_ref()
        .and_then(|e| e.text.as_deref())
        .filter(|t| !t.is_empty())
        .unwrap_or("")
        .to_string()
}

fn caption_or(content: &MessageContent, kind: MessageKind, placeholder: &str) -> String {
    content
        .media_for(kind)
        .and_then(|m| m.caption.as_deref())
        .filter(|c| !c.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{ExtendedText, MediaContent};

    #[test]
    fn empty_payload_is_text() {
        let content = MessageContent::default();
        assert_eq!(classify(&content), MessageKind::Text);
        assert_eq!(extract_body(&content, MessageKind::Text), "");
    }

    #[test]
    fn image_beats_document_in_priority() {
        let content = MessageContent {
            image_message: Some(MediaContent::default()),
            document_message: Some(MediaContent::default()),
            ..Default::default()
        };
        assert_eq!(classify(&content), MessageKind::Image);
    }

    #[test]
    fn extended_text_is_used_when_conversation_is_empty() {
        let content = MessageContent {
            conversation: Some(String::new()),
            extended_text_message: Some(ExtendedText {
                text: Some("hola".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(extract_body(&content, MessageKind::Text), "hola");
    }

    #[test]
    fn image_caption_with_placeholder_fallback() {
        let with_caption = MessageContent {
            image_message: Some(MediaContent {
                caption: Some("mira esto".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(extract_body(&with_caption, MessageKind::Image), "mira esto");

        let without = MessageContent {
            image_message: Some(MediaContent::default()),
            ..Default::default()
        };
        assert_eq!(extract_body(&without, MessageKind::Image), "[Imagen]");
    }

    #[test]
    fn document_body_includes_filename() {
        let content = MessageContent {
            document_message: Some(MediaContent {
                file_name: Some("informe.pdf".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            extract_body(&content, MessageKind::Document),
            "[Documento: informe.pdf]"
        );

        let unnamed = MessageContent {
            document_message: Some(MediaContent::default()),
            ..Default::default()
        };
        assert_eq!(
            extract_body(&unnamed, MessageKind::Document),
            "[Documento: archivo]"
        );
    }
}
