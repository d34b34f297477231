use directories::ProjectDirs;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::PathBuf;

use matraca_core::jid;

use crate::error::{DbError, Result};
use crate::models::{ChatSummary, Contact, MergeReport, Message, NewMessage, TicketState};
use crate::schema::SCHEMA;

pub struct InboxDb {
    pool: Pool<Sqlite>,
}

impl InboxDb {
    pub async fn new() -> Result<Self> {
        let db_path = Self::default_db_path()?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&db_url).await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::info!("Database initialized at: {}", db_path.display());

        Ok(Self { pool })
    }

    pub async fn new_with_path(path: &str) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePool::connect(&db_url).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Every `:memory:` connection is its own database, so the pool
    /// is pinned to a single connection.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    fn default_db_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com.br", "matraca", "matraca").ok_or(DbError::NoDataDir)?;
        Ok(dirs.data_dir().join("matraca.db"))
    }

    // ── Contacts ───────────────────────────────────────────────────

    pub async fn get_contact(&self, id: i64) -> Result<Contact> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|_| DbError::ContactNotFound(id.to_string()))
    }

    pub async fn get_contact_by_jid(&self, remote_jid: &str) -> Result<Option<Contact>> {
        Ok(
            sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE remote_jid = ?")
                .bind(remote_jid)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Find the contact for a remote JID, creating it on first sight,
    /// and apply the per-message refresh rules: backfill the shadow id
    /// when the JID is a "@lid" form, and upgrade the display name
    /// from the push name when no real name was ever captured (the
    /// stored name is still the phone number or the raw JID).
    pub async fn find_or_create_contact(
        &self,
        remote_jid: &str,
        push_name: Option<&str>,
    ) -> Result<Contact> {
        let now = epoch_now();

        let mut contact = match self.get_contact_by_jid(remote_jid).await? {
            Some(c) => c,
            None => {
                let display_name = jid::display_name_for(remote_jid, push_name);
                let phone_number = jid::phone_from_jid(remote_jid);

                sqlx::query(
                    "INSERT OR IGNORE INTO contacts (remote_jid, phone_number, display_name, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(remote_jid)
                .bind(&phone_number)
                .bind(&display_name)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?;

                self.get_contact_by_jid(remote_jid)
                    .await?
                    .ok_or_else(|| DbError::ContactNotFound(remote_jid.to_string()))?
            }
        };

        let mut lid = contact.lid.clone();
        if jid::is_lid_jid(remote_jid) && lid.as_deref() != Some(remote_jid) {
            lid = Some(remote_jid.to_string());
        }

        let mut display_name = contact.display_name.clone();
        if let Some(push) = push_name.map(str::trim).filter(|p| !p.is_empty()) {
            let never_named = display_name == contact.remote_jid
                || contact
                    .phone_number
                    .as_deref()
                    .is_some_and(|p| p == display_name);
            if never_named && display_name != push {
                display_name = push.to_string();
            }
        }

        if lid != contact.lid || display_name != contact.display_name {
            sqlx::query("UPDATE contacts SET lid = ?, display_name = ?, updated_at = ? WHERE id = ?")
                .bind(&lid)
                .bind(&display_name)
                .bind(now)
                .bind(contact.id)
                .execute(&self.pool)
                .await?;

            contact.lid = lid;
            contact.display_name = display_name;
            contact.updated_at = now;
        }

        Ok(contact)
    }

    pub async fn touch_last_seen(&self, contact_id: i64, seen_at: i64) -> Result<()> {
        sqlx::query("UPDATE contacts SET last_seen = ?, updated_at = ? WHERE id = ?")
            .bind(seen_at)
            .bind(epoch_now())
            .bind(contact_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_ticket_state(&self, contact_id: i64, state: TicketState) -> Result<()> {
        sqlx::query("UPDATE contacts SET ticket_state = ?, updated_at = ? WHERE id = ?")
            .bind(state)
            .bind(epoch_now())
            .bind(contact_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Messages ───────────────────────────────────────────────────

    pub async fn message_exists(&self, gateway_message_id: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM messages WHERE gateway_message_id = ?")
                .bind(gateway_message_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Insert a message, relying on the unique index over
    /// `gateway_message_id` to absorb duplicate webhook deliveries.
    /// Returns false when the row already existed.
    pub async fn insert_message(&self, msg: NewMessage<'_>) -> Result<bool> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO messages
               (gateway_message_id, contact_id, is_from_me, body, media_url, media_kind, sent_at, is_read, is_automated, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(msg.gateway_message_id)
        .bind(msg.contact_id)
        .bind(msg.is_from_me)
        .bind(msg.body)
        .bind(msg.media_url)
        .bind(msg.media_kind)
        .bind(msg.sent_at)
        .bind(msg.is_read)
        .bind(msg.is_automated)
        .bind(epoch_now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_messages(
        &self,
        contact_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>> {
        Ok(sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE contact_id = ? ORDER BY sent_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(contact_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }

    /// New messages for the active conversation, for the polling
    /// clients' "since timestamp" query.
    pub async fn messages_since(&self, contact_id: i64, since: i64) -> Result<Vec<Message>> {
        Ok(sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE contact_id = ? AND sent_at > ? ORDER BY sent_at, id",
        )
        .bind(contact_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn mark_read(&self, contact_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1 WHERE contact_id = ? AND is_from_me = 0 AND is_read = 0",
        )
        .bind(contact_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Chat list with last-message summary and unread count, newest
    /// activity first.
    pub async fn chat_summaries(&self) -> Result<Vec<ChatSummary>> {
        Ok(sqlx::query_as::<_, ChatSummary>(
            r#"SELECT c.id AS contact_id, c.remote_jid, c.display_name, c.ticket_state,
                      (SELECT body FROM messages WHERE contact_id = c.id ORDER BY sent_at DESC, id DESC LIMIT 1) AS last_body,
                      (SELECT sent_at FROM messages WHERE contact_id = c.id ORDER BY sent_at DESC, id DESC LIMIT 1) AS last_at,
                      (SELECT COUNT(*) FROM messages WHERE contact_id = c.id AND is_read = 0 AND is_from_me = 0) AS unread_count
               FROM contacts c
               ORDER BY COALESCE(last_at, c.updated_at) DESC"#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    // ── Shadow-contact reconciliation ──────────────────────────────

    /// Merge "@lid" shadow contacts into their real counterparts.
    ///
    /// For each shadow: match by phone number first (the shadow's
    /// numeric-stripped id), then by exact display name, excluding
    /// identifier-looking names and self-matches. On a match, all of
    /// the shadow's messages move to the real contact, the real
    /// contact records the shadow id, and the shadow row is deleted.
    /// Unmatched shadows are left untouched, so the pass is safe to
    /// re-run. Name matching can misfire when two unrelated contacts
    /// share an exact display name.
    pub async fn merge_shadow_contacts(&self) -> Result<MergeReport> {
        let shadows: Vec<Contact> =
            sqlx::query_as("SELECT * FROM contacts WHERE remote_jid LIKE '%@lid'")
                .fetch_all(&self.pool)
                .await?;

        let mut report = MergeReport::default();

        for shadow in shadows {
            match self.merge_target_for(&shadow).await? {
                Some(real) => {
                    self.absorb_shadow(&shadow, &real).await?;
                    tracing::info!(
                        shadow = %shadow.remote_jid,
                        into = %real.remote_jid,
                        "Merged shadow contact"
                    );
                    report.merged += 1;
                }
                None => report.unmatched += 1,
            }
        }

        Ok(report)
    }

    async fn merge_target_for(&self, shadow: &Contact) -> Result<Option<Contact>> {
        let digits = jid::lid_digits(&shadow.remote_jid);
        if !digits.is_empty() {
            let by_phone: Option<Contact> = sqlx::query_as(
                "SELECT * FROM contacts WHERE phone_number = ? AND remote_jid NOT LIKE '%@lid' LIMIT 1",
            )
            .bind(&digits)
            .fetch_optional(&self.pool)
            .await?;
            if by_phone.is_some() {
                return Ok(by_phone);
            }
        }

        if jid::looks_like_identifier(&shadow.display_name) {
            return Ok(None);
        }

        Ok(sqlx::query_as(
            "SELECT * FROM contacts WHERE display_name = ? AND remote_jid NOT LIKE '%@lid' AND id != ? LIMIT 1",
        )
        .bind(&shadow.display_name)
        .bind(shadow.id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn absorb_shadow(&self, shadow: &Contact, real: &Contact) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE messages SET contact_id = ? WHERE contact_id = ?")
            .bind(real.id)
            .bind(shadow.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE contacts SET lid = ?, updated_at = ? WHERE id = ?")
            .bind(&shadow.remote_jid)
            .bind(epoch_now())
            .bind(real.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(shadow.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn epoch_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> InboxDb {
        InboxDb::new_in_memory().await.unwrap()
    }

    fn inbound<'a>(id: &'a str, contact_id: i64, body: &'a str) -> NewMessage<'a> {
        NewMessage {
            gateway_message_id: id,
            contact_id,
            is_from_me: false,
            body,
            media_url: None,
            media_kind: None,
            sent_at: 1_700_000_000,
            is_read: false,
            is_automated: false,
        }
    }

    #[tokio::test]
    async fn creates_contact_with_phone_fallback_name() {
        let db = db().await;
        let contact = db
            .find_or_create_contact("5215512345678@s.whatsapp.net", None)
            .await
            .unwrap();

        assert_eq!(contact.display_name, "5215512345678");
        assert_eq!(contact.phone_number.as_deref(), Some("5215512345678"));
        assert_eq!(contact.lid, None);
    }

    #[tokio::test]
    async fn push_name_upgrades_placeholder_display_name() {
        let db = db().await;
        let jid = "5215512345678@s.whatsapp.net";

        let first = db.find_or_create_contact(jid, None).await.unwrap();
        assert_eq!(first.display_name, "5215512345678");

        let renamed = db.find_or_create_contact(jid, Some("Maria")).await.unwrap();
        assert_eq!(renamed.id, first.id);
        assert_eq!(renamed.display_name, "Maria");

        // a later, different push name must not clobber a real name
        let again = db.find_or_create_contact(jid, Some("Maria G")).await.unwrap();
        assert_eq!(again.display_name, "Maria");
    }

    #[tokio::test]
    async fn lid_jid_backfills_shadow_id() {
        let db = db().await;
        let contact = db.find_or_create_contact("987654@lid", None).await.unwrap();
        assert_eq!(contact.lid.as_deref(), Some("987654@lid"));
        assert_eq!(contact.display_name, "987654@lid");
    }

    #[tokio::test]
    async fn duplicate_gateway_id_inserts_once() {
        let db = db().await;
        let contact = db
            .find_or_create_contact("5215512345678@s.whatsapp.net", None)
            .await
            .unwrap();

        assert!(db.insert_message(inbound("MSG1", contact.id, "hola")).await.unwrap());
        assert!(!db.insert_message(inbound("MSG1", contact.id, "hola")).await.unwrap());

        let messages = db.get_messages(contact.id, 10, 0).await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn merge_by_phone_moves_messages_and_deletes_shadow() {
        let db = db().await;
        let real = db
            .find_or_create_contact("12345@s.whatsapp.net", Some("Maria"))
            .await
            .unwrap();
        let shadow = db.find_or_create_contact("12345@lid", None).await.unwrap();

        db.insert_message(inbound("S1", shadow.id, "uno")).await.unwrap();
        db.insert_message(inbound("S2", shadow.id, "dos")).await.unwrap();

        let report = db.merge_shadow_contacts().await.unwrap();
        assert_eq!(report.merged, 1);
        assert_eq!(report.unmatched, 0);

        let moved = db.get_messages(real.id, 10, 0).await.unwrap();
        assert_eq!(moved.len(), 2);

        let real = db.get_contact(real.id).await.unwrap();
        assert_eq!(real.lid.as_deref(), Some("12345@lid"));

        assert!(db.get_contact_by_jid("12345@lid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_by_display_name_excludes_identifier_names() {
        let db = db().await;
        db.find_or_create_contact("999888@s.whatsapp.net", Some("Carlos"))
            .await
            .unwrap();
        // shadow whose digits match nothing, but whose push name does
        db.find_or_create_contact("777@lid", Some("Carlos")).await.unwrap();
        // shadow with no name signal at all: stays
        db.find_or_create_contact("555@lid", None).await.unwrap();

        let report = db.merge_shadow_contacts().await.unwrap();
        assert_eq!(report.merged, 1);
        assert_eq!(report.unmatched, 1);

        assert!(db.get_contact_by_jid("555@lid").await.unwrap().is_some());

        // idempotent: re-running merges nothing new
        let again = db.merge_shadow_contacts().await.unwrap();
        assert_eq!(again.merged, 0);
        assert_eq!(again.unmatched, 1);
    }

    #[tokio::test]
    async fn summaries_track_unread_and_last_message() {
        let db = db().await;
        let contact = db
            .find_or_create_contact("12345@s.whatsapp.net", Some("Maria"))
            .await
            .unwrap();

        db.insert_message(inbound("M1", contact.id, "primero")).await.unwrap();
        let mut second = inbound("M2", contact.id, "segundo");
        second.sent_at = 1_700_000_100;
        db.insert_message(second).await.unwrap();

        let summaries = db.chat_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].last_body.as_deref(), Some("segundo"));
        assert_eq!(summaries[0].unread_count, 2);
        assert_eq!(summaries[0].ticket_state, TicketState::None);

        assert_eq!(db.mark_read(contact.id).await.unwrap(), 2);
        let summaries = db.chat_summaries().await.unwrap();
        assert_eq!(summaries[0].unread_count, 0);
    }

    #[tokio::test]
    async fn messages_since_returns_only_newer_rows() {
        let db = db().await;
        let contact = db
            .find_or_create_contact("12345@s.whatsapp.net", None)
            .await
            .unwrap();

        let mut old = inbound("OLD", contact.id, "viejo");
        old.sent_at = 100;
        db.insert_message(old).await.unwrap();

        let mut new = inbound("NEW", contact.id, "nuevo");
        new.sent_at = 200;
        db.insert_message(new).await.unwrap();

        let since = db.messages_since(contact.id, 100).await.unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].gateway_message_id, "NEW");
    }
}
