//! Notification delivery.
//!
//! - `NotificationSink`: transport seam (send/edit text and photo messages)
//! - `RateLimiter`: pacing of dispatch calls within one run
//! - `Dispatcher`: turns classified events into at most one delivery action
//! - `TelegramSink`: Bot API implementation of the sink

pub mod dispatcher;
pub mod rate_limit;
pub mod telegram;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::MessageId;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use rate_limit::{Pause, RateLimiter};
pub use telegram::TelegramSink;

/// Result of a sink call.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// A chat channel that can receive and edit messages.
///
/// Message bodies are MarkdownV2.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_text(&self, chat: &str, text: &str) -> TransportResult<MessageId>;

    async fn send_photo(
        &self,
        chat: &str,
        photo_url: &str,
        caption: &str,
    ) -> TransportResult<MessageId>;

    async fn edit_text(&self, chat: &str, message_id: &MessageId, text: &str)
    -> TransportResult<()>;

    async fn edit_caption(
        &self,
        chat: &str,
        message_id: &MessageId,
        photo_url: &str,
        caption: &str,
    ) -> TransportResult<()>;
}
