use serde::{Deserialize, Serialize};

/// Helpdesk linkage state of a contact, used by the frontend for row
/// coloring. Not ticket data itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    None,
    Pending,
    InProgress,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub remote_jid: String,
    /// Shadow ("@lid") identifier, once correlated with this contact.
    pub lid: Option<String>,
    pub phone_number: Option<String>,
    pub display_name: String,
    pub is_online: bool,
    pub last_seen: Option<i64>,
    pub ticket_state: TicketState,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub gateway_message_id: String,
    pub contact_id: i64,
    pub is_from_me: bool,
    pub body: String,
    pub media_url: Option<String>,
    pub media_kind: Option<String>,
    pub sent_at: i64,
    pub is_read: bool,
    pub is_automated: bool,
    pub created_at: i64,
}

/// Insert parameters for a message row.
#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub gateway_message_id: &'a str,
    pub contact_id: i64,
    pub is_from_me: bool,
    pub body: &'a str,
    pub media_url: Option<&'a str>,
    pub media_kind: Option<&'a str>,
    pub sent_at: i64,
    pub is_read: bool,
    pub is_automated: bool,
}

/// One row of the chat list served to polling clients.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatSummary {
    pub contact_id: i64,
    pub remote_jid: String,
    pub display_name: String,
    pub ticket_state: TicketState,
    pub last_body: Option<String>,
    pub last_at: Option<i64>,
    pub unread_count: i64,
}

/// Result of a shadow-contact reconciliation pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MergeReport {
    pub merged: u32,
    pub unmatched: u32,
}
