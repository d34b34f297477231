use async_trait::async_trait;

use crate::kind::MessageKind;

/// Media bytes as delivered by the gateway: base64 content plus the
/// declared mimetype, when known.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub base64: String,
    pub mimetype: Option<String>,
}

/// Fallback source for media that did not arrive inline with the
/// webhook event. Failures are swallowed at this boundary: `None`
/// means "no media available", and the implementation is expected to
/// log the reason itself.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch_media(&self, message_id: &str, kind: MessageKind) -> Option<MediaPayload>;
}

/// Truncate a mimetype at its first `;`, dropping codec parameters
/// (`audio/ogg; codecs=opus` -> `audio/ogg`).
pub fn normalize_mimetype(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Strip a `data:<mime>;base64,` prefix, if present.
pub fn strip_data_uri(raw: &str) -> &str {
    if raw.starts_with("data:") {
        match raw.find("base64,") {
            Some(pos) => &raw[pos + "base64,".len()..],
            None => raw,
        }
    } else {
        raw
    }
}

/// File extension for a normalized mimetype.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/3gpp" => "3gp",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "application/pdf" => "pdf",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        _ => return None,
    };
    Some(ext)
}

/// Pick the extension for a stored media file.
///
/// Documents keep the original filename's extension when there is
/// one; everything else goes through the mimetype table, then the
/// per-kind default.
pub fn resolve_extension(
    kind: MessageKind,
    mimetype: Option<&str>,
    file_name: Option<&str>,
) -> String {
    if kind == MessageKind::Document {
        if let Some(name) = file_name {
            if let Some((_, ext)) = name.rsplit_once('.') {
                if !ext.is_empty() {
                    return ext.to_ascii_lowercase();
                }
            }
        }
    }

    mimetype
        .map(normalize_mimetype)
        .as_deref()
        .and_then(extension_for_mime)
        .unwrap_or_else(|| kind.default_extension())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mimetype_codec_suffix_is_dropped() {
        assert_eq!(normalize_mimetype("audio/ogg; codecs=opus"), "audio/ogg");
        assert_eq!(normalize_mimetype("image/jpeg"), "image/jpeg");
    }

    #[test]
    fn data_uri_prefix_is_stripped() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("AAAA"), "AAAA");
    }

    #[test]
    fn ogg_audio_resolves_ogg() {
        let ext = resolve_extension(MessageKind::Audio, Some("audio/ogg; codecs=opus"), None);
        assert_eq!(ext, "ogg");
    }

    #[test]
    fn document_filename_wins_over_mimetype() {
        let ext = resolve_extension(
            MessageKind::Document,
            Some("application/octet-stream"),
            Some("report.final.pdf"),
        );
        assert_eq!(ext, "pdf");
    }

    #[test]
    fn unknown_mimetype_falls_back_to_kind_default() {
        assert_eq!(resolve_extension(MessageKind::Image, Some("image/x-weird"), None), "jpg");
        assert_eq!(resolve_extension(MessageKind::Document, None, None), "bin");
    }
}
