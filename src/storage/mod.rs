//! Storage abstractions for event persistence.
//!
//! The store is the only durable holder of event state. It is keyed by the
//! `(title, date)` natural key and offers lookup, insert and update; callers
//! look up before writing, so inserts never overwrite and updates never create.
//!
//! ## File Layout
//!
//! ```text
//! data/
//! └── events.json   # { updated_at, count, events: [StoredRecord, ...] }
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Event;

// Re-export for convenience
pub use local::LocalStorage;

/// Persisted projection of an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRecord {
    /// Event content plus `message_id`
    #[serde(flatten)]
    pub event: Event,
    /// When the natural key was first stored
    pub first_seen: DateTime<Utc>,
    /// Last time the record was written
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Wrap a freshly seen event.
    pub fn new(event: Event) -> Self {
        let now = Utc::now();
        Self {
            event,
            first_seen: now,
            updated_at: now,
        }
    }

    /// Replace the content of an existing record, keeping `first_seen`.
    pub fn replaced_by(&self, event: Event) -> Self {
        Self {
            event,
            first_seen: self.first_seen,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> (&str, &str) {
        self.event.key()
    }

    pub fn matches(&self, title: &str, date: &str) -> bool {
        self.event.title == title && self.event.date == date
    }
}

/// On-disk document holding all records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    /// ISO 8601 timestamp of last write
    pub updated_at: DateTime<Utc>,
    /// Total record count
    pub count: usize,
    /// The records
    pub events: Vec<StoredRecord>,
}

impl StoreData {
    pub fn new(events: Vec<StoredRecord>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: events.len(),
            events,
        }
    }
}

impl Default for StoreData {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Lookup/upsert collaborator consumed by the diff engine and dispatcher.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Find the record for a natural key.
    async fn find(&self, title: &str, date: &str) -> Result<Option<StoredRecord>>;

    /// Insert a record; fails with `Conflict` if the key is already stored.
    async fn insert(&self, record: StoredRecord) -> Result<()>;

    /// Replace every field of a stored record except its key; fails with
    /// `NotFound` if the key is not stored.
    async fn update(&self, title: &str, date: &str, record: StoredRecord) -> Result<()>;
}
