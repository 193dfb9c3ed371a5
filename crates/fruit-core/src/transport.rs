//! ============================================================================
//! Chat Transport - Platform-neutral events and outgoing messages
//! ============================================================================
//! The dispatcher consumes `IncomingEvent`s and talks back through a
//! `ChatTransport`. The Telegram executor is the production implementation;
//! tests use a recording transport.
//! ============================================================================

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One inline button: visible label plus opaque callback data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard as rows of buttons
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// Text is HTML markup; user-supplied parts must already be escaped
    pub html: bool,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: false,
            keyboard: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Who sent an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Sender {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    /// Handle stored in the ledger: username if set, otherwise full name
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) if !username.is_empty() => username.clone(),
            _ => self.full_name(),
        }
    }
}

/// Inbound event from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingEvent {
    Text {
        chat_id: i64,
        message_id: i64,
        from: Sender,
        text: String,
    },
    Button {
        callback_id: String,
        chat_id: i64,
        message_id: i64,
        from: Sender,
        data: String,
    },
}

impl IncomingEvent {
    pub fn sender(&self) -> &Sender {
        match self {
            Self::Text { from, .. } | Self::Button { from, .. } => from,
        }
    }

    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Text { chat_id, .. } | Self::Button { chat_id, .. } => *chat_id,
        }
    }
}

/// Outbound side of a chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a new message. A user id as `chat_id` targets the private chat.
    async fn send_message(&self, chat_id: i64, message: &OutgoingMessage) -> Result<()>;

    /// Replace the text and keyboard of an existing message
    async fn edit_message(&self, chat_id: i64, message_id: i64, message: &OutgoingMessage) -> Result<()>;

    /// Acknowledge a button press, optionally with a short notice shown only
    /// to the presser
    async fn answer_button(&self, callback_id: &str, notice: Option<&str>) -> Result<()>;
}
