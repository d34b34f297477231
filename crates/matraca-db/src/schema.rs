pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_jid TEXT NOT NULL UNIQUE,
    lid TEXT,
    phone_number TEXT,
    display_name TEXT NOT NULL,
    is_online INTEGER NOT NULL DEFAULT 0,
    last_seen INTEGER,
    ticket_state TEXT NOT NULL DEFAULT 'none',
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_contacts_phone ON contacts(phone_number);
CREATE INDEX IF NOT EXISTS idx_contacts_lid ON contacts(lid);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    gateway_message_id TEXT NOT NULL UNIQUE,
    contact_id INTEGER NOT NULL,
    is_from_me INTEGER NOT NULL DEFAULT 0,
    body TEXT NOT NULL DEFAULT '',
    media_url TEXT,
    media_kind TEXT,
    sent_at INTEGER NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    is_automated INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_contact ON messages(contact_id);
CREATE INDEX IF NOT EXISTS idx_messages_sent_at ON messages(sent_at);
"#;
