// ============================================================================
// JsonFileStore - The ledger as a single pretty-printed JSON document
// ============================================================================

use anyhow::{anyhow, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::LedgerStore;
use crate::ledger::Ledger;
use crate::types::BotError;

/// Default document location, relative to the working directory
pub const DEFAULT_JSON_STORE_PATH: &str = "users_data.json";

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Ledger> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", self.path.display());
                return Ok(Ledger::default());
            }
            Err(e) => return Err(anyhow!("Failed to read ledger {}: {}", self.path.display(), e)),
        };

        match serde_json::from_str::<Ledger>(&raw) {
            Ok(ledger) => Ok(ledger),
            Err(e) => {
                warn!(
                    "{} - treating {} as empty",
                    BotError::StoreCorrupt(e.to_string()),
                    self.path.display()
                );
                Ok(Ledger::default())
            }
        }
    }

    fn save_all(&self, ledger: &Ledger) -> Result<()> {
        let body = serde_json::to_string_pretty(ledger)
            .map_err(|e| anyhow!("Failed to serialize ledger: {}", e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create {}: {}", parent.display(), e))?;
        }

        // Write beside the target and rename over it so readers never see half a file
        let tmp = self.temp_path();
        std::fs::write(&tmp, body).map_err(|e| anyhow!("Failed to write {}: {}", tmp.display(), e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| anyhow!("Failed to replace {}: {}", self.path.display(), e))?;

        debug!("Saved ledger ({} users) to {}", ledger.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore").field("path", &self.path).finish()
    }
}

/// Read a JSON ledger strictly, without the fail-open fallback.
/// Used when importing a document into another backend.
pub fn read_ledger_strict(path: impl AsRef<Path>) -> Result<Ledger> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
    let ledger = serde_json::from_str(&raw)
        .map_err(|e| BotError::StoreCorrupt(format!("{}: {}", path.display(), e)))?;
    info!("Read ledger document {}", path.display());
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::owned;
    use crate::types::Rarity;
    use chrono::{TimeZone, Utc};

    const WELL_FORMED: &str = r#"{
  "users": {
    "5173037460": {
      "last_spin": "2024-06-01T08:00:00Z",
      "inventory": [
        {
          "name": "Flame-Flame Fruit",
          "rarity": "Rare",
          "type": "Logia",
          "damage": 90.0,
          "health": 100.0,
          "obtained": "2024-06-01T08:00:00.123456789Z"
        },
        {
          "name": "Spin-Spin Fruit",
          "rarity": "Common",
          "type": "Paramecia",
          "damage": 15.0,
          "health": null,
          "obtained": null
        }
      ],
      "username": "alice"
    }
  }
}"#;

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.load().unwrap().is_empty());
        assert!(read_ledger_strict(&path).is_err());
    }

    #[test]
    fn test_save_load_is_identity_for_well_formed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, WELL_FORMED).unwrap();
        let store = JsonFileStore::new(&path);

        let ledger = store.load().unwrap();
        store.save_all(&ledger).unwrap();

        let rewritten: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let original: serde_json::Value = serde_json::from_str(WELL_FORMED).unwrap();
        assert_eq!(rewritten, original);
        assert_eq!(store.load().unwrap(), ledger);
    }

    #[test]
    fn test_loads_naive_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"{"users": {"1": {"last_spin": "2024-06-01T08:00:00", "inventory": [], "username": "bob"}}}"#,
        )
        .unwrap();

        let ledger = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(
            ledger.get("1").unwrap().last_draw_at,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.json");
        let store = JsonFileStore::new(&path);

        let mut ledger = Ledger::default();
        ledger.add_item("9", owned("Chop-Chop Fruit", Rarity::Uncommon));
        store.save_all(&ledger).unwrap();

        assert!(path.exists());
        assert!(!store.temp_path().exists());
        assert_eq!(store.load().unwrap(), ledger);
    }

    #[test]
    fn test_non_ascii_names_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let store = JsonFileStore::new(&path);

        let mut ledger = Ledger::default();
        ledger.get_or_create("1", "Пётр");
        store.save_all(&ledger).unwrap();

        assert!(std::fs::read_to_string(&path).unwrap().contains("Пётр"));
    }
}
