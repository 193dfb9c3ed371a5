//! ============================================================================
//! Ledger Stores - Where the ledger lives between events
//! ============================================================================
//! Every backend loads the whole ledger and replaces it in full. Reads fail
//! open: a missing or unreadable document is an empty ledger. Writes are
//! all-or-nothing per call.
//!
//! - JsonFileStore: the `users_data.json` document
//! - RedbStore:     embedded key-value database, one row per user
//! - InMemoryStore: tests and dry runs
//! ============================================================================

mod embedded;
mod json;
mod memory;

pub use embedded::RedbStore;
pub use json::{read_ledger_strict, JsonFileStore, DEFAULT_JSON_STORE_PATH};
pub use memory::InMemoryStore;

use anyhow::{anyhow, Result};
use std::str::FromStr;

use crate::ledger::Ledger;

/// Persistence seam for the ledger
pub trait LedgerStore: Send + Sync {
    /// Read the full ledger; corrupt or missing data yields an empty ledger
    fn load(&self) -> Result<Ledger>;

    /// Replace the stored ledger with `ledger`
    fn save_all(&self, ledger: &Ledger) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Store backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Redb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" | "file" => Ok(Self::Json),
            "redb" | "db" => Ok(Self::Redb),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(anyhow!("Unknown store backend '{}'. Valid values: json, redb, memory", s)),
        }
    }
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Redb => "redb",
            Self::Memory => "memory",
        }
    }
}

/// Open the selected backend. `path` overrides the backend's default location.
pub fn open_store(backend: StoreBackend, path: Option<&str>) -> Result<Box<dyn LedgerStore>> {
    let store: Box<dyn LedgerStore> = match backend {
        StoreBackend::Json => Box::new(JsonFileStore::new(path.unwrap_or(DEFAULT_JSON_STORE_PATH))),
        StoreBackend::Redb => Box::new(RedbStore::open(path)?),
        StoreBackend::Memory => Box::new(InMemoryStore::default()),
    };
    Ok(store)
}
