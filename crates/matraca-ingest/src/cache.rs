use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Raw gateway state, kept long for diagnostics.
const RAW_STATE_TTL: Duration = Duration::from_secs(3600);
/// Derived "connected" flag; short so a polling client notices loss
/// quickly.
const STATUS_TTL: Duration = Duration::from_secs(30);
/// QR codes expire upstream after a few minutes.
const QR_TTL: Duration = Duration::from_secs(180);

const KEY_RAW_STATE: &str = "connection_state";
const KEY_STATUS: &str = "connection_status";
const KEY_QR: &str = "qr_code";

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Short-TTL key-value store for the live connection state and the
/// current QR code. Last-write-wins; the gateway is the only writer
/// per transition and readers poll. In steady state the connected
/// flag and the QR are mutually exclusive: setting one clears the
/// other.
#[derive(Default)]
pub struct ConnectionStore {
    entries: Mutex<HashMap<&'static str, Entry>>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&self, key: &'static str, value: String, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    pub fn record_raw_state(&self, state: &str) {
        self.put(KEY_RAW_STATE, state.to_string(), RAW_STATE_TTL);
    }

    pub fn mark_connected(&self) {
        self.put(KEY_STATUS, "connected".to_string(), STATUS_TTL);
        self.remove(KEY_QR);
    }

    pub fn mark_disconnected(&self) {
        self.remove(KEY_STATUS);
        self.remove(KEY_QR);
    }

    /// Store a fresh QR data-URI. A new QR implies "not yet
    /// connected", so the connected flag is dropped.
    pub fn store_qr(&self, data_uri: String) {
        self.put(KEY_QR, data_uri, QR_TTL);
        self.remove(KEY_STATUS);
    }

    pub fn raw_state(&self) -> Option<String> {
        self.get(KEY_RAW_STATE)
    }

    pub fn connection_status(&self) -> Option<String> {
        self.get(KEY_STATUS)
    }

    pub fn qr_code(&self) -> Option<String> {
        self.get(KEY_QR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_flag_clears_qr() {
        let store = ConnectionStore::new();
        store.store_qr("data:image/png;base64,AAAA".to_string());
        assert!(store.qr_code().is_some());

        store.mark_connected();
        assert_eq!(store.connection_status().as_deref(), Some("connected"));
        assert!(store.qr_code().is_none());
    }

    #[test]
    fn fresh_qr_clears_connected_flag() {
        let store = ConnectionStore::new();
        store.mark_connected();
        store.store_qr("data:image/png;base64,BBBB".to_string());

        assert!(store.connection_status().is_none());
        assert_eq!(store.qr_code().as_deref(), Some("data:image/png;base64,BBBB"));
    }

    #[test]
    fn disconnect_clears_both() {
        let store = ConnectionStore::new();
        store.record_raw_state("close");
        store.mark_connected();
        store.mark_disconnected();

        assert!(store.connection_status().is_none());
        assert!(store.qr_code().is_none());
        assert_eq!(store.raw_state().as_deref(), Some("close"));
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let store = ConnectionStore::new();
        store.put(KEY_STATUS, "connected".to_string(), Duration::ZERO);
        assert!(store.connection_status().is_none());
    }
}
