//! In-memory sink for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::MessageId;
use crate::notify::{NotificationSink, TransportResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendText { chat: String, text: String },
    SendPhoto { chat: String, photo_url: String, caption: String },
    EditText { chat: String, message_id: MessageId, text: String },
    EditCaption { chat: String, message_id: MessageId, caption: String },
}

impl Call {
    pub fn body(&self) -> &str {
        match self {
            Call::SendText { text, .. } | Call::EditText { text, .. } => text,
            Call::SendPhoto { caption, .. } | Call::EditCaption { caption, .. } => caption,
        }
    }

    pub fn chat(&self) -> &str {
        match self {
            Call::SendText { chat, .. }
            | Call::SendPhoto { chat, .. }
            | Call::EditText { chat, .. }
            | Call::EditCaption { chat, .. } => chat,
        }
    }
}

/// Records every call and answers with configurable errors.
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<Call>>,
    pub next_id: AtomicI64,
    pub photo_error: Option<TransportError>,
    pub send_error: Option<TransportError>,
    pub caption_error: Option<TransportError>,
    pub edit_error: Option<TransportError>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self) -> MessageId {
        MessageId::from(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn answer<T>(&self, error: &Option<TransportError>, ok: impl FnOnce() -> T) -> TransportResult<T> {
        match error {
            Some(e) => Err(e.clone()),
            None => Ok(ok()),
        }
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_text(&self, chat: &str, text: &str) -> TransportResult<MessageId> {
        self.record(Call::SendText {
            chat: chat.into(),
            text: text.into(),
        });
        self.answer(&self.send_error, || self.next_id())
    }

    async fn send_photo(
        &self,
        chat: &str,
        photo_url: &str,
        caption: &str,
    ) -> TransportResult<MessageId> {
        self.record(Call::SendPhoto {
            chat: chat.into(),
            photo_url: photo_url.into(),
            caption: caption.into(),
        });
        let error = self.photo_error.clone().or_else(|| self.send_error.clone());
        self.answer(&error, || self.next_id())
    }

    async fn edit_text(
        &self,
        chat: &str,
        message_id: &MessageId,
        text: &str,
    ) -> TransportResult<()> {
        self.record(Call::EditText {
            chat: chat.into(),
            message_id: message_id.clone(),
            text: text.into(),
        });
        self.answer(&self.edit_error, || ())
    }

    async fn edit_caption(
        &self,
        chat: &str,
        message_id: &MessageId,
        _photo_url: &str,
        caption: &str,
    ) -> TransportResult<()> {
        self.record(Call::EditCaption {
            chat: chat.into(),
            message_id: message_id.clone(),
            caption: caption.into(),
        });
        let error = self.caption_error.clone().or_else(|| self.edit_error.clone());
        self.answer(&error, || ())
    }
}
