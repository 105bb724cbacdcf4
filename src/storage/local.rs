//! Local filesystem storage implementation.
//!
//! Keeps every record in a single JSON document that is rewritten atomically
//! on each insert or update. Listings are a few hundred events at most, so a
//! read-modify-write per operation is cheap.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::{EventStore, StoreData, StoredRecord};

/// JSON file storage backend.
pub struct LocalStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a LocalStorage backed by the given file. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Create a LocalStorage and check that an existing file is readable.
    ///
    /// A missing file is fine (first run); a corrupt one is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self::new(path);
        let data = storage.read_data().await?;
        log::debug!(
            "Opened event store {} ({} records)",
            storage.path.display(),
            data.count
        );
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read the whole document, empty if the file doesn't exist.
    async fn read_data(&self) -> Result<StoreData> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreData::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_data(&self, events: Vec<StoredRecord>) -> Result<()> {
        let data = StoreData::new(events);
        let bytes = serde_json::to_vec_pretty(&data)?;
        self.write_bytes(&bytes).await
    }

    /// Load the whole document.
    pub async fn load(&self) -> Result<StoreData> {
        let _guard = self.lock.lock().await;
        self.read_data().await
    }
}

#[async_trait]
impl EventStore for LocalStorage {
    async fn find(&self, title: &str, date: &str) -> Result<Option<StoredRecord>> {
        let _guard = self.lock.lock().await;
        let data = self.read_data().await?;
        Ok(data.events.into_iter().find(|r| r.matches(title, date)))
    }

    async fn insert(&self, record: StoredRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut events = self.read_data().await?.events;

        let (title, date) = record.key();
        if events.iter().any(|r| r.matches(title, date)) {
            return Err(AppError::conflict(title, date));
        }

        log::debug!("Store insert: {}", record.event);
        events.push(record);
        self.write_data(events).await
    }

    async fn update(&self, title: &str, date: &str, mut record: StoredRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut events = self.read_data().await?.events;

        let slot = events
            .iter_mut()
            .find(|r| r.matches(title, date))
            .ok_or_else(|| AppError::not_found(title, date))?;

        // The natural key is immutable.
        record.event.title = title.to_string();
        record.event.date = date.to_string();
        log::debug!("Store update: {}", record.event);
        *slot = record;

        self.write_data(events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, MessageId};

    fn record(title: &str) -> StoredRecord {
        let mut event = Event::new(title, "12 mayo");
        event.purchase_url = Some("http://x".into());
        StoredRecord::new(event)
    }

    #[tokio::test]
    async fn test_find_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path().join("events.json")).await.unwrap();
        assert!(storage.find("Concierto X", "12 mayo").await.unwrap().is_none());
        assert_eq!(storage.load().await.unwrap().count, 0);
        assert!(!storage.path().exists());
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested/events.json"));

        storage.insert(record("Concierto X")).await.unwrap();
        let found = storage.find("Concierto X", "12 mayo").await.unwrap().unwrap();
        assert_eq!(found.event.purchase_url.as_deref(), Some("http://x"));
        assert!(storage.find("Concierto X", "13 mayo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("events.json"));

        storage.insert(record("Concierto X")).await.unwrap();
        let err = storage.insert(record("Concierto X")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        assert_eq!(storage.load().await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("events.json"));
        let original = record("Concierto X");
        storage.insert(original.clone()).await.unwrap();

        let mut event = original.event.clone();
        event.purchase_url = None;
        event.message_id = Some(MessageId("7".into()));
        storage
            .update("Concierto X", "12 mayo", original.replaced_by(event))
            .await
            .unwrap();

        let found = storage.find("Concierto X", "12 mayo").await.unwrap().unwrap();
        assert_eq!(found.event.purchase_url, None);
        assert_eq!(found.event.message_id, Some(MessageId("7".into())));
        assert_eq!(found.first_seen, original.first_seen);
    }

    #[tokio::test]
    async fn test_update_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("events.json"));
        let err = storage
            .update("Concierto X", "12 mayo", record("Concierto X"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        LocalStorage::new(&path)
            .insert(record("Concierto X"))
            .await
            .unwrap();

        let reopened = LocalStorage::open(&path).await.unwrap();
        assert!(reopened.find("Concierto X", "12 mayo").await.unwrap().is_some());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_open_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LocalStorage::open(&path).await,
            Err(AppError::Json(_))
        ));
    }
}
