//! ============================================================================
//! Catalog - Static fruit definitions grouped by rarity
//! ============================================================================
//! Loaded once at startup from `{ "devil_fruits": { "<Rarity>": [ ... ] } }`
//! and never mutated afterwards. Every tier must be present and non-empty.
//! ============================================================================

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::types::{BotError, ItemDefinition, Rarity};

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    devil_fruits: BTreeMap<String, Vec<CatalogEntry>>,
}

/// One entry as written in the catalog file. A `rarity` field, if present,
/// is ignored in favour of the tier it is listed under.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    damage: f64,
    #[serde(default)]
    health: Option<f64>,
}

/// Read-only fruit catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tiers: [Vec<ItemDefinition>; 5],
}

impl Catalog {
    /// Load and validate the catalog file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read catalog {}: {}", path.display(), e))?;
        let catalog = Self::from_json(&raw)?;

        info!("Loaded catalog from {} ({} fruits)", path.display(), catalog.len());
        Ok(catalog)
    }

    /// Parse and validate a catalog document
    pub fn from_json(raw: &str) -> Result<Self> {
        let doc: CatalogDocument =
            serde_json::from_str(raw).map_err(|e| anyhow!("Failed to parse catalog: {}", e))?;

        let mut tiers: [Vec<ItemDefinition>; 5] = Default::default();
        for (tier_name, entries) in doc.devil_fruits {
            let rarity: Rarity = tier_name
                .parse()
                .map_err(|_| anyhow!("Unknown rarity tier in catalog: {}", tier_name))?;

            tiers[rarity.index()].extend(entries.into_iter().map(|entry| ItemDefinition {
                name: entry.name,
                rarity,
                kind: entry.kind,
                damage: entry.damage,
                health: entry.health,
            }));
        }

        let catalog = Self { tiers };
        catalog.validate()?;
        catalog.warn_on_duplicate_names();
        Ok(catalog)
    }

    /// Build a catalog from already-typed tiers without validation
    pub fn from_tiers(tiers: impl IntoIterator<Item = (Rarity, Vec<ItemDefinition>)>) -> Self {
        let mut catalog = Self::default();
        for (rarity, items) in tiers {
            catalog.tiers[rarity.index()].extend(items);
        }
        catalog
    }

    /// Every tier must have at least one fruit
    pub fn validate(&self) -> Result<(), BotError> {
        match Rarity::ALL.iter().find(|r| self.items(**r).is_empty()) {
            Some(rarity) => Err(BotError::CatalogEmpty(*rarity)),
            None => Ok(()),
        }
    }

    pub fn items(&self, rarity: Rarity) -> &[ItemDefinition] {
        &self.tiers[rarity.index()]
    }

    /// Tiers in fixed order, Common first
    pub fn tiers(&self) -> impl Iterator<Item = (Rarity, &[ItemDefinition])> {
        Rarity::ALL.iter().map(move |r| (*r, self.items(*r)))
    }

    /// Case-insensitive exact name lookup; first match in tier order wins
    pub fn find_by_name(&self, name: &str) -> Option<&ItemDefinition> {
        let wanted = name.trim().to_lowercase();
        self.tiers
            .iter()
            .flatten()
            .find(|item| item.name.to_lowercase() == wanted)
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn warn_on_duplicate_names(&self) {
        let mut seen = HashSet::new();
        for item in self.tiers.iter().flatten() {
            if !seen.insert(item.name.to_lowercase()) {
                warn!(
                    "Catalog lists '{}' more than once; lookups will use the first entry",
                    item.name
                );
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_CATALOG: &str = r#"{
        "devil_fruits": {
            "Common": [
                {"name": "Spring-Spring Fruit", "type": "Paramecia", "damage": 20, "health": 60},
                {"name": "Spin-Spin Fruit", "type": "Paramecia", "damage": 15}
            ],
            "Uncommon": [
                {"name": "Chop-Chop Fruit", "type": "Paramecia", "damage": 35, "health": 80}
            ],
            "Rare": [
                {"name": "Flame-Flame Fruit", "rarity": "Rare", "type": "Logia", "damage": 90, "health": 100}
            ],
            "Legendary": [
                {"name": "Quake-Quake Fruit", "type": "Paramecia", "damage": 150, "health": 140}
            ],
            "Mythical": [
                {"name": "Dragon-Dragon Fruit", "type": "Zoan", "damage": 220, "health": 300}
            ]
        }
    }"#;

    pub(crate) fn sample_catalog() -> Catalog {
        Catalog::from_json(SAMPLE_CATALOG).unwrap()
    }

    #[test]
    fn test_parse_sample_catalog() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.items(Rarity::Common).len(), 2);
        assert_eq!(catalog.items(Rarity::Rare)[0].rarity, Rarity::Rare);
        assert_eq!(catalog.items(Rarity::Common)[1].health, None);
    }

    #[test]
    fn test_tier_key_overrides_entry_rarity() {
        let raw = SAMPLE_CATALOG.replace(r#""rarity": "Rare""#, r#""rarity": "Common""#);
        let catalog = Catalog::from_json(&raw).unwrap();
        let flame = catalog.find_by_name("Flame-Flame Fruit").unwrap();
        assert_eq!(flame.rarity, Rarity::Rare);
    }

    #[test]
    fn test_find_by_name_case_insensitive() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.find_by_name("flame-flame fruit").map(|i| i.name.as_str()),
            Some("Flame-Flame Fruit")
        );
        assert_eq!(
            catalog.find_by_name("  DRAGON-DRAGON FRUIT").map(|i| i.rarity),
            Some(Rarity::Mythical)
        );
        assert!(catalog.find_by_name("Gum-Gum Fruit").is_none());
    }

    #[test]
    fn test_first_match_in_tier_order() {
        let def = |name: &str, rarity: Rarity, kind: &str| ItemDefinition {
            name: name.into(),
            rarity,
            kind: kind.into(),
            damage: 1.0,
            health: None,
        };
        let catalog = Catalog::from_tiers([
            (Rarity::Mythical, vec![def("Twin Fruit", Rarity::Mythical, "Zoan")]),
            (Rarity::Uncommon, vec![def("Twin Fruit", Rarity::Uncommon, "Logia")]),
        ]);
        assert_eq!(catalog.find_by_name("twin fruit").unwrap().kind, "Logia");
    }

    #[test]
    fn test_empty_tier_rejected() {
        let raw = r#"{"devil_fruits": {
            "Common": [{"name": "A", "type": "t", "damage": 1}],
            "Uncommon": [{"name": "B", "type": "t", "damage": 1}],
            "Rare": [{"name": "C", "type": "t", "damage": 1}],
            "Legendary": [],
            "Mythical": [{"name": "E", "type": "t", "damage": 1}]
        }}"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert_eq!(
            err.downcast_ref::<BotError>(),
            Some(&BotError::CatalogEmpty(Rarity::Legendary))
        );
    }

    #[test]
    fn test_missing_tier_rejected() {
        let raw = r#"{"devil_fruits": {"Common": [{"name": "A", "type": "t", "damage": 1}]}}"#;
        assert!(Catalog::from_json(raw).is_err());
    }

    #[test]
    fn test_unknown_tier_rejected() {
        let raw = SAMPLE_CATALOG.replace("\"Mythical\"", "\"Epic\"");
        let err = Catalog::from_json(&raw).unwrap_err();
        assert!(err.to_string().contains("Epic"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Fruits.json");
        std::fs::write(&path, SAMPLE_CATALOG).unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 6);
        assert!(Catalog::load(dir.path().join("missing.json")).is_err());
    }
}
