//! Diff calculation for event notifications.
//!
//! Classifies each scraped event against the store by natural key:
//! absent keys are new, stored keys with different content are changed,
//! everything else is unchanged. Ticket availability is just another field.

use std::fmt;

use crate::error::Result;
use crate::models::Event;
use crate::storage::{EventStore, StoredRecord};

/// Classification of one scraped event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Natural key not stored yet
    New(Event),
    /// Stored with different content
    Changed { old: StoredRecord, new: Event },
    /// Stored with identical content
    Unchanged(StoredRecord),
}

impl Classification {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::New(_) => ChangeKind::New,
            Self::Changed { .. } => ChangeKind::Changed,
            Self::Unchanged(_) => ChangeKind::Unchanged,
        }
    }

    /// The scraped event (or the stored one when unchanged).
    pub fn event(&self) -> &Event {
        match self {
            Self::New(event) | Self::Changed { new: event, .. } => event,
            Self::Unchanged(record) => &record.event,
        }
    }

    /// Content fields that differ from the stored record.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        match self {
            Self::Changed { old, new } => new.changed_fields(&old.event),
            _ => Vec::new(),
        }
    }
}

/// Discriminant of [`Classification`], for counting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    New,
    Changed,
    Unchanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "NEW",
            Self::Changed => "CHANGED",
            Self::Unchanged => "UNCHANGED",
        })
    }
}

/// Classifier of scraped events against the store.
#[derive(Clone, Copy)]
pub struct DiffEngine<'a> {
    store: &'a dyn EventStore,
}

impl<'a> DiffEngine<'a> {
    pub fn new(store: &'a dyn EventStore) -> Self {
        Self { store }
    }

    /// Classify one event. Only reads the store.
    pub async fn classify(&self, event: Event) -> Result<Classification> {
        let (title, date) = event.key();
        let stored = self.store.find(title, date).await?;
        let classification = match stored {
            None => Classification::New(event),
            Some(record) if event.same_content(&record.event) => Classification::Unchanged(record),
            Some(record) => Classification::Changed {
                old: record,
                new: event,
            },
        };
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;
    use crate::storage::LocalStorage;

    fn concierto() -> Event {
        let mut event = Event::new("Concierto X", "12 mayo");
        event.venue_site = Some("Teatro Y".into());
        event.purchase_url = Some("http://x".into());
        event
    }

    async fn store_with(event: Event) -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("events.json"));
        storage.insert(StoredRecord::new(event)).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_new_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("events.json"));
        let result = DiffEngine::new(&storage).classify(concierto()).await.unwrap();
        assert_eq!(result.kind(), ChangeKind::New);
        assert_eq!(result.event().title, "Concierto X");
    }

    #[tokio::test]
    async fn test_unchanged_ignores_message_id() {
        let mut stored = concierto();
        stored.message_id = Some(MessageId("42".into()));
        let (_dir, storage) = store_with(stored).await;

        let result = DiffEngine::new(&storage).classify(concierto()).await.unwrap();
        assert_eq!(result.kind(), ChangeKind::Unchanged);
        assert!(result.changed_fields().is_empty());
    }

    #[tokio::test]
    async fn test_sold_out_is_a_change() {
        let (_dir, storage) = store_with(concierto()).await;

        let mut scraped = concierto();
        scraped.purchase_url = None;
        let result = DiffEngine::new(&storage).classify(scraped).await.unwrap();

        assert_eq!(result.kind(), ChangeKind::Changed);
        assert_eq!(result.changed_fields(), vec!["purchase_url"]);
        match result {
            Classification::Changed { old, new } => {
                assert_eq!(old.event.purchase_url.as_deref(), Some("http://x"));
                assert_eq!(new.purchase_url, None);
            }
            other => panic!("expected CHANGED, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_field_changes() {
        let (_dir, storage) = store_with(concierto()).await;
        let engine = DiffEngine::new(&storage);

        let mut with_image = concierto();
        with_image.image_url = Some("https://img.example.com/x.jpg".into());
        let result = engine.classify(with_image).await.unwrap();
        assert_eq!(result.changed_fields(), vec!["image_url"]);

        let mut moved = concierto();
        moved.venue_site = Some("Teatro Z".into());
        let result = engine.classify(moved).await.unwrap();
        assert_eq!(result.changed_fields(), vec!["venue_site"]);
    }

    #[tokio::test]
    async fn test_other_date_is_new() {
        let (_dir, storage) = store_with(concierto()).await;
        let mut other_day = concierto();
        other_day.date = "13 mayo".into();
        let result = DiffEngine::new(&storage).classify(other_day).await.unwrap();
        assert_eq!(result.kind(), ChangeKind::New);
    }
}
