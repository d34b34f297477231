use serde_json::Value;

/// The webhook event families the pipeline reacts to. Anything else
/// is acknowledged and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    MessagesUpsert,
    ConnectionUpdate,
    QrcodeUpdated,
    Unknown,
}

impl EventFamily {
    /// Parse an event name tolerantly: case-insensitive, with `.`,
    /// `_` and `-` treated as the same separator. The gateway emits
    /// `messages.upsert`, `connection.update`, `qrcode.updated`.
    pub fn parse(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '.' || c == '_' { '-' } else { c })
            .collect();

        match normalized.as_str() {
            "messages-upsert" | "message-upsert" => EventFamily::MessagesUpsert,
            "connection-update" => EventFamily::ConnectionUpdate,
            "qrcode-updated" => EventFamily::QrcodeUpdated,
            _ => EventFamily::Unknown,
        }
    }
}

/// Event name for a delivery: the URL path segment wins, then the
/// body's `event` field, then `"unknown"`.
pub fn resolve_event_name(path_event: Option<&str>, body: &Value) -> String {
    if let Some(name) = path_event {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    body.get("event")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_gateway_event_names() {
        assert_eq!(EventFamily::parse("messages.upsert"), EventFamily::MessagesUpsert);
        assert_eq!(EventFamily::parse("MESSAGES_UPSERT"), EventFamily::MessagesUpsert);
        assert_eq!(EventFamily::parse("connection-update"), EventFamily::ConnectionUpdate);
        assert_eq!(EventFamily::parse("qrcode.updated"), EventFamily::QrcodeUpdated);
        assert_eq!(EventFamily::parse("chats.update"), EventFamily::Unknown);
    }

    #[test]
    fn path_segment_wins_over_body_field() {
        let body = json!({"event": "connection.update"});
        assert_eq!(resolve_event_name(Some("messages.upsert"), &body), "messages.upsert");
        assert_eq!(resolve_event_name(None, &body), "connection.update");
        assert_eq!(resolve_event_name(None, &json!({})), "unknown");
    }
}
