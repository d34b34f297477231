use matraca_core::{MessageEnvelope, classify, extract_body};
use matraca_db::{InboxDb, NewMessage};

use crate::error::Result;
use crate::media::MediaResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PersistResult {
    Saved,
    Duplicate,
}

/// Persist one message envelope: resolve the contact, normalize the
/// content, optionally resolve media, then insert behind the unique
/// gateway-id index. Callers are expected to have filtered group and
/// empty JIDs already.
pub(crate) async fn persist_envelope(
    db: &InboxDb,
    media: Option<&MediaResolver>,
    envelope: &MessageEnvelope,
) -> Result<PersistResult> {
    let key = &envelope.key;

    let contact = db
        .find_or_create_contact(&key.remote_jid, envelope.push_name.as_deref())
        .await?;

    let content = envelope.content();
    let kind = classify(&content);
    let body = extract_body(&content, kind);

    let media_url = match media {
        Some(resolver) if kind.is_media() => resolver.resolve(&key.id, kind, &content).await,
        _ => None,
    };

    let sent_at = envelope.message_timestamp.unwrap_or_else(epoch_now);

    let inserted = db
        .insert_message(NewMessage {
            gateway_message_id: &key.id,
            contact_id: contact.id,
            is_from_me: key.from_me,
            body: &body,
            media_url: media_url.as_deref(),
            media_kind: kind.is_media().then(|| kind.as_str()),
            sent_at,
            is_read: key.from_me,
            is_automated: false,
        })
        .await?;

    if inserted && !key.from_me {
        db.touch_last_seen(contact.id, sent_at).await?;
    }

    Ok(if inserted {
        PersistResult::Saved
    } else {
        PersistResult::Duplicate
    })
}

pub(crate) fn epoch_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
