//! Telegram Bot API sink.
//!
//! Talks to `sendMessage`, `sendPhoto`, `editMessageText` and
//! `editMessageMedia` with `parse_mode = MarkdownV2`, and maps the API's
//! error envelope onto [`TransportError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Result, TransportError};
use crate::models::{MessageId, TelegramConfig};
use crate::notify::{NotificationSink, TransportResult};

const PARSE_MODE: &str = "MarkdownV2";

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

/// Sink backed by the Telegram Bot API.
pub struct TelegramSink {
    client: Client,
    base_url: String,
}

impl TelegramSink {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
        })
    }

    async fn call(&self, method: &str, body: Value) -> TransportResult<Value> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let envelope: ApiResponse = response.json().await.map_err(|e| {
            TransportError::Failure(format!("{method}: unreadable response ({status}): {e}"))
        })?;

        if envelope.ok {
            return Ok(envelope.result.unwrap_or(Value::Null));
        }
        Err(classify_error(
            envelope.error_code.unwrap_or(status.as_u16()),
            envelope.description.as_deref().unwrap_or(""),
        ))
    }

    async fn send(&self, method: &str, body: Value) -> TransportResult<MessageId> {
        let result = self.call(method, body).await?;
        result
            .get("message_id")
            .and_then(Value::as_i64)
            .map(MessageId::from)
            .ok_or_else(|| TransportError::Failure(format!("{method}: response without message_id")))
    }
}

/// Telegram expects integer message ids; anything else is passed through.
fn message_id_value(id: &MessageId) -> Value {
    id.0.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(id.0.clone()))
}

/// Map a Bot API error onto the transport error kinds.
///
/// 400 means Telegram refused the request itself (bad photo, bad markup,
/// unchanged edit); anything else is a delivery failure.
pub fn classify_error(code: u16, description: &str) -> TransportError {
    let lowered = description.to_lowercase();
    match code {
        400 if lowered.contains("message is not modified") => TransportError::NotModified,
        400 => TransportError::Rejected(description.to_string()),
        _ => TransportError::Failure(format!("{code}: {description}")),
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send_text(&self, chat: &str, text: &str) -> TransportResult<MessageId> {
        self.send(
            "sendMessage",
            json!({ "chat_id": chat, "text": text, "parse_mode": PARSE_MODE }),
        )
        .await
    }

    async fn send_photo(
        &self,
        chat: &str,
        photo_url: &str,
        caption: &str,
    ) -> TransportResult<MessageId> {
        self.send(
            "sendPhoto",
            json!({
                "chat_id": chat,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": PARSE_MODE,
            }),
        )
        .await
    }

    async fn edit_text(
        &self,
        chat: &str,
        message_id: &MessageId,
        text: &str,
    ) -> TransportResult<()> {
        self.call(
            "editMessageText",
            json!({
                "chat_id": chat,
                "message_id": message_id_value(message_id),
                "text": text,
                "parse_mode": PARSE_MODE,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn edit_caption(
        &self,
        chat: &str,
        message_id: &MessageId,
        photo_url: &str,
        caption: &str,
    ) -> TransportResult<()> {
        // editMessageMedia replaces photo and caption together.
        self.call(
            "editMessageMedia",
            json!({
                "chat_id": chat,
                "message_id": message_id_value(message_id),
                "media": {
                    "type": "photo",
                    "media": photo_url,
                    "caption": caption,
                    "parse_mode": PARSE_MODE,
                },
            }),
        )
        .await
        .map(|_| ())
    }
}
