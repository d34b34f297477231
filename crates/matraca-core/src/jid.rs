//! Helpers for the gateway's chat identifiers (JIDs).

pub const USER_SUFFIX: &str = "@s.whatsapp.net";
pub const GROUP_SUFFIX: &str = "@g.us";
pub const LID_SUFFIX: &str = "@lid";

/// Group chats (and the status broadcast pseudo-chat) are skipped by
/// the ingestion pipeline.
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with(GROUP_SUFFIX) || jid == "status@broadcast"
}

/// Opaque linked-device ("shadow") identifier.
pub fn is_lid_jid(jid: &str) -> bool {
    jid.ends_with(LID_SUFFIX)
}

/// Phone number from a user JID: the part before `@`, minus any
/// `:device` suffix, when it is all digits.
pub fn phone_from_jid(jid: &str) -> Option<String> {
    if !jid.ends_with(USER_SUFFIX) {
        return None;
    }
    let user = jid.split('@').next()?;
    let user = user.split(':').next()?;
    if !user.is_empty() && user.chars().all(|c| c.is_ascii_digit()) {
        Some(user.to_string())
    } else {
        None
    }
}

/// Digits of a shadow JID's local part, used to correlate it with a
/// real contact's phone number.
pub fn lid_digits(jid: &str) -> String {
    jid.split('@')
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect()
}

/// True when a stored display name is really just an identifier (a
/// bare number or a JID) rather than a human-entered name.
pub fn looks_like_identifier(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    name.contains('@') || name.chars().all(|c| c.is_ascii_digit())
}

/// Display name for a new contact: push name when the event carries
/// one, else the phone number, else the raw JID.
pub fn display_name_for(remote_jid: &str, push_name: Option<&str>) -> String {
    if let Some(name) = push_name {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    phone_from_jid(remote_jid).unwrap_or_else(|| remote_jid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_group_jids() {
        assert!(is_group_jid("123456-789@g.us"));
        assert!(is_group_jid("status@broadcast"));
        assert!(!is_group_jid("5215512345678@s.whatsapp.net"));
    }

    #[test]
    fn extracts_phone_from_user_jid() {
        assert_eq!(
            phone_from_jid("5215512345678@s.whatsapp.net"),
            Some("5215512345678".to_string())
        );
        assert_eq!(
            phone_from_jid("5215512345678:12@s.whatsapp.net"),
            Some("5215512345678".to_string())
        );
        assert_eq!(phone_from_jid("abc123@lid"), None);
    }

    #[test]
    fn lid_digits_strips_non_numeric() {
        assert_eq!(lid_digits("12345@lid"), "12345");
        assert_eq!(lid_digits("a1b2c3@lid"), "123");
    }

    #[test]
    fn identifier_names_are_flagged() {
        assert!(looks_like_identifier("5215512345678"));
        assert!(looks_like_identifier("12345@lid"));
        assert!(!looks_like_identifier("Maria"));
        assert!(!looks_like_identifier(""));
    }

    #[test]
    fn display_name_fallback_chain() {
        assert_eq!(
            display_name_for("5215512345678@s.whatsapp.net", Some("Maria")),
            "Maria"
        );
        assert_eq!(
            display_name_for("5215512345678@s.whatsapp.net", Some("  ")),
            "5215512345678"
        );
        assert_eq!(display_name_for("abc@lid", None), "abc@lid");
    }
}
