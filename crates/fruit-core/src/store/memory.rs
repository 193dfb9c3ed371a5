use anyhow::{anyhow, Result};
use std::sync::Mutex;

use super::LedgerStore;
use crate::ledger::Ledger;

/// Ledger held in process memory; lost on exit
#[derive(Debug, Default)]
pub struct InMemoryStore {
    ledger: Mutex<Ledger>,
}

impl InMemoryStore {
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
        }
    }
}

impl LedgerStore for InMemoryStore {
    fn load(&self) -> Result<Ledger> {
        let ledger = self
            .ledger
            .lock()
            .map_err(|_| anyhow!("In-memory ledger lock poisoned"))?;
        Ok(ledger.clone())
    }

    fn save_all(&self, ledger: &Ledger) -> Result<()> {
        let mut stored = self
            .ledger
            .lock()
            .map_err(|_| anyhow!("In-memory ledger lock poisoned"))?;
        *stored = ledger.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
