// src/models/mod.rs

//! Domain models for the bot.
//!
//! This module contains the canonical event shape, its message rendering and
//! the configuration structures.

mod config;
mod event;
pub mod message;

// Re-export all public types
pub use config::{
    Config, DispatchConfig, HttpConfig, RateLimitConfig, SourceConfig, StoreConfig,
    TelegramConfig,
};
pub use event::{Event, MessageId, RawFields};
pub use message::{FormattedMessage, escape_markdown, render};
