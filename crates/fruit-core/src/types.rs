//! ============================================================================
//! Core Types for the Fruit Collector
//! ============================================================================
//! Rarity tiers, catalog item definitions, owned item instances and the
//! per-user record persisted in the ledger. The serde layout of these types is
//! the on-disk document format, so field renames here are format changes.
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cooldown::Remaining;

/// Rarity tiers, ordered from most to least common
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
    Mythical,
}

impl Rarity {
    /// Every tier in display and draw-table order
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Legendary,
        Rarity::Mythical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Legendary => "Legendary",
            Self::Mythical => "Mythical",
        }
    }

    /// Position in [`Rarity::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Self::Common => 0,
            Self::Uncommon => 1,
            Self::Rare => 2,
            Self::Legendary => 3,
            Self::Mythical => 4,
        }
    }
}

/// Tier names parse case-insensitively
impl FromStr for Rarity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "common" => Ok(Self::Common),
            "uncommon" => Ok(Self::Uncommon),
            "rare" => Ok(Self::Rare),
            "legendary" => Ok(Self::Legendary),
            "mythical" => Ok(Self::Mythical),
            _ => Err(anyhow::anyhow!("Unknown rarity '{}'", s.trim())),
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fruit as defined in the static catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub name: String,
    pub rarity: Rarity,
    #[serde(rename = "type")]
    pub kind: String,
    pub damage: f64,
    #[serde(default)]
    pub health: Option<f64>,
}

/// A fruit sitting in somebody's collection.
/// Duplicates are separate entries, never merged into a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub name: String,
    pub rarity: Rarity,
    #[serde(rename = "type")]
    pub kind: String,
    pub damage: f64,
    #[serde(default)]
    pub health: Option<f64>,
    /// When the item was drawn; operator grants leave this empty
    #[serde(default, with = "timestamp_opt")]
    pub obtained: Option<DateTime<Utc>>,
}

impl OwnedItem {
    pub fn from_definition(def: &ItemDefinition, obtained: Option<DateTime<Utc>>) -> Self {
        Self {
            name: def.name.clone(),
            rarity: def.rarity,
            kind: def.kind.clone(),
            damage: def.damage,
            health: def.health,
            obtained,
        }
    }

    /// Case-insensitive name comparison used by revoke
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// Ledger entry for one user. The user id is the ledger key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "last_spin", default, with = "timestamp_opt")]
    pub last_draw_at: Option<DateTime<Utc>>,
    /// Owned items in acquisition order
    #[serde(rename = "inventory", default)]
    pub collection: Vec<OwnedItem>,
    #[serde(rename = "username", default)]
    pub display_name: String,
}

impl UserRecord {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            last_draw_at: None,
            collection: Vec::new(),
            display_name: display_name.into(),
        }
    }

    /// Number of owned items with exactly this name
    pub fn count_named(&self, name: &str) -> usize {
        self.collection.iter().filter(|item| item.name == name).count()
    }

    /// Snapshot of owned items of one rarity, in acquisition order
    pub fn items_of(&self, rarity: Rarity) -> Vec<OwnedItem> {
        self.collection
            .iter()
            .filter(|item| item.rarity == rarity)
            .cloned()
            .collect()
    }
}

/// Domain errors. User-facing wording lives in [`crate::messages`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BotError {
    #[error("Catalog has no {0} items")]
    CatalogEmpty(Rarity),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Draw on cooldown: {}h {}m remaining", .0.hours(), .0.minutes())]
    CooldownActive(Remaining),

    #[error("Ledger store is corrupt: {0}")]
    StoreCorrupt(String),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),
}

/// Parse a stored timestamp. RFC 3339 is what we write; naive ISO-8601
/// values without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
}

/// serde adapter for optional timestamps stored as strings
pub mod timestamp_opt {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse_timestamp(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
