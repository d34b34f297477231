use serde::Deserialize;

/// Contact entry from the gateway's `findContacts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteContact {
    pub id: String,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}

/// Chat entry from the gateway's `findChats`. The JID field name has
/// varied across gateway versions, so both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChat {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub remote_jid: Option<String>,
}

impl RemoteChat {
    pub fn jid(&self) -> Option<&str> {
        self.remote_jid.as_deref().or(self.id.as_deref())
    }
}
