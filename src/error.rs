// src/error.rs

//! Unified error handling for the bot.

use std::fmt;

use thiserror::Error;

/// Result type alias for bot operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed scraped record
    #[error("Validation error: {0}")]
    Validation(String),

    /// Insert of a natural key that is already stored
    #[error("Event already stored: {title} ({date})")]
    Conflict { title: String, date: String },

    /// Update of a natural key that is not stored
    #[error("Event not found in store: {title} ({date})")]
    NotFound { title: String, date: String },

    /// Notification sink error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Source adapter failed to fetch its listing
    #[error("Source error for {source_name}: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// Every configured source failed in a run
    #[error("All {0} sources failed to fetch events")]
    AllSourcesFailed(usize),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a source error with the adapter name as context.
    pub fn source(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub fn conflict(title: &str, date: &str) -> Self {
        Self::Conflict {
            title: title.to_string(),
            date: date.to_string(),
        }
    }

    pub fn not_found(title: &str, date: &str) -> Self {
        Self::NotFound {
            title: title.to_string(),
            date: date.to_string(),
        }
    }
}

/// Failure reported by a notification sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The sink refused the content (bad photo URL, malformed markup, ...)
    #[error("content rejected: {0}")]
    Rejected(String),

    /// An edit would leave the message exactly as it is
    #[error("message is not modified")]
    NotModified,

    /// Network, authentication, rate limiting or anything else
    #[error("delivery failed: {0}")]
    Failure(String),
}

impl TransportError {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::NotModified)
    }
}

impl From<reqwest::Error> for TransportError {
    // Request URLs embed the bot token.
    fn from(e: reqwest::Error) -> Self {
        Self::Failure(e.without_url().to_string())
    }
}
