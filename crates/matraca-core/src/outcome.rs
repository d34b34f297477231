use serde::Serialize;

/// Result of handling one webhook delivery. Serialized into the
/// `{"status": ...}` acknowledgement body; the HTTP status is always
/// 200 so the gateway never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Ignored,
    NoData,
    IgnoredGroup,
    MessageExists,
    InvalidContact,
    MessageSaved,
    ConnectionUpdated,
    QrcodeUpdated,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::NoData => "no_data",
            WebhookOutcome::IgnoredGroup => "ignored_group",
            WebhookOutcome::MessageExists => "message_exists",
            WebhookOutcome::InvalidContact => "invalid_contact",
            WebhookOutcome::MessageSaved => "message_saved",
            WebhookOutcome::ConnectionUpdated => "connection_updated",
            WebhookOutcome::QrcodeUpdated => "qrcode_updated",
        }
    }
}
