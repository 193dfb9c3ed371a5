// ============================================================================
// RedbStore — Embedded Database (redb)
// ============================================================================
// One row per user in the `users` table, keyed `users:<id>`, value is the
// bincode-encoded UserRecord. save_all swaps the whole table inside a single
// write transaction.
// Default path: ~/.fruitbot/ledger.redb (override via FRUIT_STORE_PATH)
// ============================================================================

use anyhow::{anyhow, Result};
use redb::{Database, TableDefinition};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::LedgerStore;
use crate::ledger::Ledger;
use crate::types::{BotError, UserRecord};

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

const KEY_PREFIX: &str = "users:";

/// Embedded ledger database
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses ~/.fruitbot/ledger.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = match path {
            Some(p) => PathBuf::from(p),
            None => default_db_path()?,
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create {}: {}", parent.display(), e))?;
        }

        info!("Opening ledger database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open database: {}", e))?;

        // Ensure the table exists so the first load can open it
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn
                .open_table(USERS)
                .map_err(|e| anyhow!("Failed to create users table: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        Ok(Self { db, path: db_path })
    }
}

/// ~/.fruitbot/ledger.redb
fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".fruitbot").join("ledger.redb"))
}

impl LedgerStore for RedbStore {
    fn load(&self) -> Result<Ledger> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(USERS)
            .map_err(|e| anyhow!("Failed to open users table: {}", e))?;

        let mut ledger = Ledger::default();
        let iter = table.range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate users: {}", e))?;
        for entry in iter {
            let (key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let key = key.value();
            let user_id = key.strip_prefix(KEY_PREFIX).unwrap_or(key);

            match bincode::deserialize::<UserRecord>(value.value()) {
                Ok(record) => ledger.put(user_id, record),
                Err(e) => warn!(
                    "{} - skipping row",
                    BotError::StoreCorrupt(format!("user {}: {}", user_id, e))
                ),
            }
        }

        debug!("Loaded {} users from {}", ledger.len(), self.path.display());
        Ok(ledger)
    }

    fn save_all(&self, ledger: &Ledger) -> Result<()> {
        let mut rows = Vec::with_capacity(ledger.len());
        for (user_id, record) in ledger.iter() {
            let value = bincode::serialize(record)
                .map_err(|e| anyhow!("Failed to serialize user {}: {}", user_id, e))?;
            rows.push((format!("{}{}", KEY_PREFIX, user_id), value));
        }

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        write_txn.delete_table(USERS)
            .map_err(|e| anyhow!("Failed to clear users table: {}", e))?;
        {
            let mut table = write_txn.open_table(USERS)
                .map_err(|e| anyhow!("Failed to open users table: {}", e))?;
            for (key, value) in &rows {
                table.insert(key.as_str(), value.as_slice())
                    .map_err(|e| anyhow!("Failed to insert user: {}", e))?;
            }
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored {} users in {}", rows.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("redb:{}", self.path.display())
    }
}
