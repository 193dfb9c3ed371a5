//! ============================================================================
//! Executor Module - Chat platform executors
//! ============================================================================
//! - TelegramExecutor: Telegram Bot API (long polling, messages, buttons)
//! ============================================================================

mod telegram;

pub use telegram::{TelegramExecutor, Update, User};
