use std::path::PathBuf;

use chrono::{Datelike, Utc};
use uuid::Uuid;

/// Durable media storage on the local filesystem, namespaced by
/// year/month, served back as public URLs.
pub struct MediaStore {
    root: PathBuf,
    public_base: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Write media bytes under `whatsapp/YYYY/MM/<uuid>.<ext>` and
    /// return the public URL of the stored object.
    pub async fn store(&self, bytes: &[u8], extension: &str) -> std::io::Result<String> {
        let now = Utc::now();
        let relative = format!("whatsapp/{}/{:02}", now.year(), now.month());

        let dir = self.root.join(&relative);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        Ok(format!("{}/{}/{}", self.public_base, relative, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_bytes_under_year_month_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "http://localhost:3000/media/");

        let url = store.store(b"fake image bytes", "jpg").await.unwrap();

        assert!(url.starts_with("http://localhost:3000/media/whatsapp/"));
        assert!(url.ends_with(".jpg"));

        let relative = url.strip_prefix("http://localhost:3000/media/").unwrap();
        let stored = tokio::fs::read(dir.path().join(relative)).await.unwrap();
        assert_eq!(stored, b"fake image bytes");
    }
}
