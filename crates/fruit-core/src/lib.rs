//! ============================================================================
//! FRUIT-CORE: Devil fruit collection bot
//! ============================================================================
//! This crate handles all backend logic for the fruit bot:
//! - Weighted rarity draws with a per-user cooldown
//! - Persistent ledger of collections (JSON file or redb)
//! - Operator grant/revoke/list commands behind an allow-list
//! - Paginated collection browsing over Telegram inline buttons
//! ============================================================================

pub mod access;
pub mod admin;
pub mod browser;
pub mod catalog;
pub mod config;
pub mod cooldown;
pub mod dispatcher;
pub mod draw;
pub mod executor;
pub mod ledger;
pub mod messages;
pub mod store;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use types::*;
pub use access::{OperatorAllowList, Role};
pub use browser::SessionRegistry;
pub use catalog::Catalog;
pub use config::BotConfig;
pub use cooldown::{Clock, CooldownPolicy, SystemClock};
pub use dispatcher::Dispatcher;
pub use draw::{DrawEngine, DrawOutcome, RarityWeights};
pub use executor::TelegramExecutor;
pub use ledger::{Ledger, LedgerStats};
pub use store::{open_store, LedgerStore, StoreBackend};
pub use transport::{ChatTransport, IncomingEvent, OutgoingMessage};
