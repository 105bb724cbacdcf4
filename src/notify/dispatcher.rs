//! Notification dispatcher.
//!
//! Turns one classified event into at most one delivery action and records
//! the outcome in the store:
//!
//! | Classification | Action | Store |
//! |---|---|---|
//! | NEW | send (photo, text-only retry on rejection) | insert on success only |
//! | CHANGED, delivered before | edit in place | update always |
//! | CHANGED, never delivered | send as new | update on success only |
//! | UNCHANGED | nothing | nothing |

use std::fmt;

use crate::error::{Result, TransportError};
use crate::models::{
    Config, Event, FormattedMessage, MessageId, RateLimitConfig, escape_markdown, render,
};
use crate::notify::{NotificationSink, RateLimiter, TransportResult};
use crate::pipeline::Classification;
use crate::storage::{EventStore, StoredRecord};

/// What happened to one classified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A new message was delivered
    Announced {
        message_id: MessageId,
        /// The photo was rejected and the message went out as text
        photo_dropped: bool,
    },
    /// Stored without a message (sold out and not announced)
    StoredSilently,
    /// The live message was edited
    Edited,
    /// The live message already showed this content
    AlreadyCurrent,
    /// The edit failed; the stored record was updated anyway
    EditFailed,
    /// Delivery failed; nothing was stored
    Failed,
    /// Nothing to do
    Unchanged,
}

impl DispatchOutcome {
    /// Whether the outcome was escalated to the operator.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::EditFailed | Self::Failed)
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Announced {
                message_id,
                photo_dropped: false,
            } => write!(f, "announced (message {message_id})"),
            Self::Announced {
                message_id,
                photo_dropped: true,
            } => write!(f, "announced without photo (message {message_id})"),
            Self::StoredSilently => f.write_str("stored without announcement"),
            Self::Edited => f.write_str("message edited"),
            Self::AlreadyCurrent => f.write_str("message already current"),
            Self::EditFailed => f.write_str("edit failed, record updated"),
            Self::Failed => f.write_str("delivery failed"),
            Self::Unchanged => f.write_str("unchanged"),
        }
    }
}

/// Rate-limited delivery of new and changed events to one chat.
pub struct Dispatcher<S: NotificationSink> {
    sink: S,
    chat_id: String,
    alert_chat_id: Option<String>,
    limiter: RateLimiter,
    announce_sold_out: bool,
    escalations: usize,
}

impl<S: NotificationSink> Dispatcher<S> {
    /// Create a dispatcher with default pacing and no alert channel.
    pub fn new(sink: S, chat_id: impl Into<String>) -> Self {
        Self {
            sink,
            chat_id: chat_id.into(),
            alert_chat_id: None,
            limiter: RateLimiter::default(),
            announce_sold_out: true,
            escalations: 0,
        }
    }

    /// Create a dispatcher from the application configuration.
    pub fn from_config(sink: S, config: &Config) -> Self {
        let alert = config
            .telegram
            .alert_chat_id
            .clone()
            .filter(|id| !id.trim().is_empty());
        Self::new(sink, config.telegram.chat_id.clone())
            .with_rate_limit(config.rate_limit.clone())
            .with_alert_chat(alert)
            .announce_sold_out(config.dispatch.announce_sold_out)
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.limiter = RateLimiter::new(config);
        self
    }

    pub fn with_alert_chat(mut self, chat_id: Option<String>) -> Self {
        self.alert_chat_id = chat_id;
        self
    }

    pub fn announce_sold_out(mut self, announce: bool) -> Self {
        self.announce_sold_out = announce;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Failures surfaced to the operator so far.
    pub fn escalations(&self) -> usize {
        self.escalations
    }

    /// Deliver one classified event and record the outcome.
    ///
    /// Transport failures are escalated and reported through the outcome;
    /// only store errors are returned as `Err`.
    pub async fn dispatch(
        &mut self,
        classification: Classification,
        store: &dyn EventStore,
    ) -> Result<DispatchOutcome> {
        match classification {
            Classification::New(event) => self.dispatch_new(event, store).await,
            Classification::Changed { old, new } => self.dispatch_changed(old, new, store).await,
            Classification::Unchanged(_) => Ok(DispatchOutcome::Unchanged),
        }
    }

    async fn dispatch_new(
        &mut self,
        mut event: Event,
        store: &dyn EventStore,
    ) -> Result<DispatchOutcome> {
        event.message_id = None;

        if event.is_sold_out() && !self.announce_sold_out {
            log::info!("New event already sold out, not announcing: {event}");
            store.insert(StoredRecord::new(event)).await?;
            return Ok(DispatchOutcome::StoredSilently);
        }

        let message = render(&event);
        match self.deliver_new(&message).await {
            Ok((message_id, photo_dropped)) => {
                event.message_id = Some(message_id.clone());
                store.insert(StoredRecord::new(event)).await?;
                Ok(DispatchOutcome::Announced {
                    message_id,
                    photo_dropped,
                })
            }
            Err(e) => {
                self.escalate(&format!("Could not announce {event}"), &e)
                    .await;
                Ok(DispatchOutcome::Failed)
            }
        }
    }

    async fn dispatch_changed(
        &mut self,
        old: StoredRecord,
        mut new: Event,
        store: &dyn EventStore,
    ) -> Result<DispatchOutcome> {
        let (title, date) = (old.event.title.clone(), old.event.date.clone());

        let Some(message_id) = old.event.message_id.clone() else {
            // Never announced: this is the first chance to do so.
            new.message_id = None;
            if new.is_sold_out() && !self.announce_sold_out {
                store.update(&title, &date, old.replaced_by(new)).await?;
                return Ok(DispatchOutcome::StoredSilently);
            }

            let message = render(&new);
            return match self.deliver_new(&message).await {
                Ok((message_id, photo_dropped)) => {
                    new.message_id = Some(message_id.clone());
                    store.update(&title, &date, old.replaced_by(new)).await?;
                    Ok(DispatchOutcome::Announced {
                        message_id,
                        photo_dropped,
                    })
                }
                Err(e) => {
                    self.escalate(&format!("Could not announce {new}"), &e).await;
                    Ok(DispatchOutcome::Failed)
                }
            };
        };

        new.message_id = Some(message_id.clone());
        let message = render(&new);
        let outcome = match self.deliver_edit(&message_id, &message).await {
            Ok(()) => DispatchOutcome::Edited,
            Err(TransportError::NotModified) => {
                log::debug!("Message {message_id} didn't change");
                DispatchOutcome::AlreadyCurrent
            }
            Err(e) => {
                self.escalate(&format!("Could not edit message {message_id} for {new}"), &e)
                    .await;
                DispatchOutcome::EditFailed
            }
        };

        // Stored content follows the listing even if the live message is stale.
        store.update(&title, &date, old.replaced_by(new)).await?;
        Ok(outcome)
    }

    /// Send a new message, retrying once as text when the photo is rejected.
    async fn deliver_new(&mut self, message: &FormattedMessage) -> TransportResult<(MessageId, bool)> {
        if let Some(photo) = &message.photo_url {
            let result = self
                .sink
                .send_photo(&self.chat_id, photo, &message.body)
                .await;
            self.settle(&result).await;
            match result {
                Ok(id) => return Ok((id, false)),
                Err(e) if e.is_rejected() => {
                    log::warn!("Photo {photo} rejected ({e}), sending as text");
                }
                Err(e) => return Err(e),
            }
        }

        let text = message.without_photo();
        let result = self.sink.send_text(&self.chat_id, &text.body).await;
        self.settle(&result).await;
        result.map(|id| (id, message.has_photo()))
    }

    /// Edit a delivered message, falling back to a text edit when the
    /// caption edit is rejected.
    async fn deliver_edit(
        &mut self,
        message_id: &MessageId,
        message: &FormattedMessage,
    ) -> TransportResult<()> {
        if let Some(photo) = &message.photo_url {
            let result = self
                .sink
                .edit_caption(&self.chat_id, message_id, photo, &message.body)
                .await;
            self.settle(&result).await;
            match result {
                Err(e) if e.is_rejected() => {
                    log::warn!("Caption edit of {message_id} rejected ({e}), editing text");
                }
                other => return other,
            }
        }

        let result = self
            .sink
            .edit_text(&self.chat_id, message_id, &message.body)
            .await;
        self.settle(&result).await;
        result
    }

    /// Pace after a call that reached the transport; unchanged edits are free.
    async fn settle<T>(&mut self, result: &TransportResult<T>) {
        if !result.as_ref().is_err_and(TransportError::is_not_modified) {
            self.limiter.pace().await;
        }
    }

    /// Surface a failure on the operator channel.
    pub async fn escalate(&mut self, context: &str, error: &(dyn fmt::Display + Sync)) {
        log::error!("{context}: {error}");
        self.escalations += 1;

        if let Some(alert_chat) = &self.alert_chat_id {
            let text = escape_markdown(&format!("⚠ {context}: {error}"));
            if let Err(e) = self.sink.send_text(alert_chat, &text).await {
                log::warn!("Alert delivery to {alert_chat} failed: {e}");
            }
        }
    }
}
