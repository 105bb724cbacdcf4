// src/models/event.rs

//! Canonical event model and the normalization boundary for scraped records.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::clean_text;

/// Identifier of a delivered chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Raw field map produced by a source adapter.
///
/// Keys are source-specific; a `None` value means the field was looked for
/// but not present on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields(HashMap<String, Option<String>>);

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, keeping `None` to record that it was absent.
    pub fn set(&mut self, key: impl Into<String>, value: Option<String>) -> &mut Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Builder-style variant of [`RawFields::set`] for present values.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    /// Whitespace-normalized value of the first alias that holds a non-empty string.
    pub fn first(&self, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|key| self.0.get(*key).and_then(|v| v.as_deref()))
            .map(clean_text)
            .find(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}

mod aliases {
    pub const ID: &[&str] = &["id"];
    pub const TITLE: &[&str] = &["title"];
    pub const DATE: &[&str] = &["date"];
    pub const VENUE_SPACE: &[&str] = &["venue_space", "space"];
    pub const VENUE_SITE: &[&str] = &["venue_site", "site", "place"];
    pub const IMAGE_URL: &[&str] = &["image_url", "img_url", "img"];
    pub const INFO_URL: &[&str] = &["info_url"];
    pub const PURCHASE_URL: &[&str] = &["purchase_url", "buy_url"];
    pub const MESSAGE_ID: &[&str] = &["message_id"];
}

/// A scraped event listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Source-assigned id, not stable across runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub title: String,

    /// Free-form display date
    pub date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_space: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_site: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_url: Option<String>,

    /// Absent when tickets are sold out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_url: Option<String>,

    /// Set once a notification for the current content was delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
}

impl Event {
    /// Build a canonical event from a raw field map.
    ///
    /// Fails with a validation error when `title` or `date` is missing or empty.
    pub fn normalize(raw: &RawFields) -> Result<Self> {
        let title = raw
            .first(aliases::TITLE)
            .ok_or_else(|| AppError::validation("scraped record has no title"))?;
        let date = raw
            .first(aliases::DATE)
            .ok_or_else(|| AppError::validation(format!("scraped record '{title}' has no date")))?;

        Ok(Self {
            id: raw.first(aliases::ID),
            title,
            date,
            venue_space: raw.first(aliases::VENUE_SPACE),
            venue_site: raw.first(aliases::VENUE_SITE),
            image_url: raw.first(aliases::IMAGE_URL),
            info_url: raw.first(aliases::INFO_URL),
            purchase_url: raw.first(aliases::PURCHASE_URL),
            message_id: raw.first(aliases::MESSAGE_ID).map(MessageId),
        })
    }

    /// Minimal event with only the identity fields set.
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            date: date.into(),
            venue_space: None,
            venue_site: None,
            image_url: None,
            info_url: None,
            purchase_url: None,
            message_id: None,
        }
    }

    /// The `(title, date)` natural key.
    pub fn key(&self) -> (&str, &str) {
        (&self.title, &self.date)
    }

    pub fn is_sold_out(&self) -> bool {
        self.purchase_url.as_deref().is_none_or(str::is_empty)
    }

    /// Names of the content fields that differ from `other`.
    ///
    /// `message_id` is delivery metadata and never compared.
    pub fn changed_fields(&self, other: &Event) -> Vec<&'static str> {
        let pairs: [(&'static str, bool); 8] = [
            ("id", self.id == other.id),
            ("title", self.title == other.title),
            ("date", self.date == other.date),
            ("venue_space", self.venue_space == other.venue_space),
            ("venue_site", self.venue_site == other.venue_site),
            ("image_url", self.image_url == other.image_url),
            ("info_url", self.info_url == other.info_url),
            ("purchase_url", self.purchase_url == other.purchase_url),
        ];
        pairs
            .into_iter()
            .filter(|(_, same)| !same)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn same_content(&self, other: &Event) -> bool {
        self.changed_fields(other).is_empty()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.date)
    }
}
