use std::sync::Arc;

use serde::Serialize;

use matraca_core::jid;
use matraca_db::InboxDb;
use matraca_gateway::EvolutionClient;

use crate::error::Result;
use crate::pipeline::{PersistResult, persist_envelope};

/// Pulls existing contacts and chat history from the gateway into the
/// local database. Used for the initial backfill after an instance is
/// linked; the webhook keeps things current afterwards.
pub struct Importer {
    db: Arc<InboxDb>,
    gateway: Arc<EvolutionClient>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HistoryImport {
    pub saved: u32,
    pub skipped: u32,
}

impl Importer {
    pub fn new(db: Arc<InboxDb>, gateway: Arc<EvolutionClient>) -> Self {
        Self { db, gateway }
    }

    /// Import the gateway's contact book, skipping groups. Returns
    /// the number of contacts touched.
    pub async fn import_contacts(&self) -> Result<u32> {
        let contacts = self.gateway.find_contacts().await?;
        let mut count = 0u32;

        for remote in contacts {
            if remote.id.is_empty() || jid::is_group_jid(&remote.id) {
                continue;
            }
            self.db
                .find_or_create_contact(&remote.id, remote.push_name.as_deref())
                .await?;
            count += 1;
        }

        tracing::info!(count, "Imported contacts from gateway");
        Ok(count)
    }

    /// Import message history for one chat, newer than `since` when
    /// given. Media is not re-downloaded for historical messages.
    pub async fn import_history(
        &self,
        remote_jid: &str,
        since: Option<i64>,
    ) -> Result<HistoryImport> {
        let envelopes = self.gateway.fetch_messages(remote_jid, since).await?;
        let mut stats = HistoryImport::default();

        for envelope in envelopes {
            let key = &envelope.key;
            if key.id.is_empty() || key.remote_jid.is_empty() || jid::is_group_jid(&key.remote_jid)
            {
                stats.skipped += 1;
                continue;
            }

            match persist_envelope(&self.db, None, &envelope).await {
                Ok(PersistResult::Saved) => stats.saved += 1,
                Ok(PersistResult::Duplicate) => stats.skipped += 1,
                Err(e) => {
                    tracing::warn!(id = %key.id, error = %e, "Skipping unimportable message");
                    stats.skipped += 1;
                }
            }
        }

        tracing::info!(remote_jid, saved = stats.saved, skipped = stats.skipped, "History import done");
        Ok(stats)
    }

    /// Import history for every non-group chat the gateway knows.
    pub async fn import_all_history(&self, since: Option<i64>) -> Result<HistoryImport> {
        let chats = self.gateway.find_chats().await?;
        let mut totals = HistoryImport::default();

        for chat in chats {
            let Some(jid) = chat.jid() else { continue };
            if jid.is_empty() || jid::is_group_jid(jid) {
                continue;
            }
            let stats = self.import_history(jid, since).await?;
            totals.saved += stats.saved;
            totals.skipped += stats.skipped;
        }

        Ok(totals)
    }
}
