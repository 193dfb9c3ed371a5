//! ============================================================================
//! Telegram Executor - Telegram Bot API transport
//! ============================================================================
//! Handles the Bot API side of the bot using token authentication:
//! - Long-poll updates and convert them to `IncomingEvent`s
//! - Send and edit HTML messages with inline keyboards
//! - Acknowledge button presses
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::transport::{ChatTransport, IncomingEvent, Keyboard, OutgoingMessage, Sender};

/// Telegram Bot API base URL
const TELEGRAM_API: &str = "https://api.telegram.org";

/// Extra time the HTTP request gets beyond the long-poll timeout
const POLL_GRACE_SECS: u64 = 10;

/// Executor for Telegram bot operations
pub struct TelegramExecutor {
    client: reqwest::Client,
    bot_token: String,
}

impl TelegramExecutor {
    /// Create a new TelegramExecutor with bot token
    pub fn new(bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", TELEGRAM_API, self.bot_token, method)
    }

    /// POST a Bot API method and unwrap the `{ok, result}` envelope
    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Telegram {} request failed: {}", method, e.without_url()))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Telegram {} response ({}): {}", method, status, e.without_url()))?;

        if !envelope.ok {
            return Err(anyhow!(
                "Telegram API error {} on {}: {}",
                status,
                method,
                envelope.description.unwrap_or_default()
            ));
        }

        envelope
            .result
            .ok_or_else(|| anyhow!("Telegram {} response had no result", method))
    }

    /// Bot identity, used as a startup token check
    pub async fn get_me(&self) -> Result<User> {
        let me: User = self.call("getMe", &serde_json::json!({}), None).await?;
        info!("Authenticated as @{}", me.username.as_deref().unwrap_or(&me.first_name));
        Ok(me)
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message", "callback_query"],
        };
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &request,
                Some(Duration::from_secs(timeout_secs + POLL_GRACE_SECS)),
            )
            .await?;
        if !updates.is_empty() {
            debug!("Received {} updates", updates.len());
        }
        Ok(updates)
    }
}

#[async_trait]
impl ChatTransport for TelegramExecutor {
    async fn send_message(&self, chat_id: i64, message: &OutgoingMessage) -> Result<()> {
        debug!("Sending to chat {}: {}...", chat_id, preview(&message.text));
        let request = SendMessageRequest::new(chat_id, message);
        let _: serde_json::Value = self.call("sendMessage", &request, None).await?;
        Ok(())
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, message: &OutgoingMessage) -> Result<()> {
        debug!("Editing message {} in chat {}", message_id, chat_id);
        let request = EditMessageRequest {
            message_id,
            inner: SendMessageRequest::new(chat_id, message),
        };
        let _: serde_json::Value = self.call("editMessageText", &request, None).await?;
        Ok(())
    }

    async fn answer_button(&self, callback_id: &str, notice: Option<&str>) -> Result<()> {
        let request = AnswerCallbackRequest {
            callback_query_id: callback_id,
            text: notice,
        };
        let _: bool = self.call("answerCallbackQuery", &request, None).await?;
        Ok(())
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

// ============================================================================
// Telegram API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

impl<'a> SendMessageRequest<'a> {
    fn new(chat_id: i64, message: &'a OutgoingMessage) -> Self {
        Self {
            chat_id,
            text: &message.text,
            parse_mode: message.html.then_some("HTML"),
            reply_markup: message.keyboard.as_ref().map(InlineKeyboardMarkup::from),
        }
    }
}

#[derive(Debug, Serialize)]
struct EditMessageRequest<'a> {
    message_id: i64,
    #[serde(flatten)]
    inner: SendMessageRequest<'a>,
}

#[derive(Debug, Serialize)]
struct AnswerCallbackRequest<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Serialize, PartialEq)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct InlineKeyboardButton {
    text: String,
    callback_data: String,
}

impl From<&Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        let inline_keyboard = keyboard
            .rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| {
                row.iter()
                    .map(|b| InlineKeyboardButton {
                        text: b.label.clone(),
                        callback_data: b.data.clone(),
                    })
                    .collect()
            })
            .collect();
        Self { inline_keyboard }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl From<User> for Sender {
    fn from(user: User) -> Self {
        Sender {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct Message {
    message_id: i64,
    from: Option<User>,
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<Message>,
    data: Option<String>,
}

/// One entry from `getUpdates`
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
}

impl Update {
    /// Text messages and button presses; anything else is `None`
    pub fn into_event(self) -> Option<IncomingEvent> {
        if let Some(message) = self.message {
            let from = message.from?;
            if from.is_bot {
                return None;
            }
            return Some(IncomingEvent::Text {
                chat_id: message.chat.id,
                message_id: message.message_id,
                from: from.into(),
                text: message.text?,
            });
        }

        let query = self.callback_query?;
        let message = query.message?;
        Some(IncomingEvent::Button {
            callback_id: query.id,
            chat_id: message.chat.id,
            message_id: message.message_id,
            from: query.from.into(),
            data: query.data?,
        })
    }
}
