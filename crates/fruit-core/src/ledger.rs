//! ============================================================================
//! User Ledger - In-memory view of every user's record
//! ============================================================================
//! The whole ledger is loaded from a [`crate::store::LedgerStore`], mutated,
//! and written back in full. Serialises directly as the store document
//! `{ "users": { "<id>": { ... } } }`.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{OwnedItem, Rarity, UserRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
}

/// Aggregate counts for inspection tooling
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_users: usize,
    pub total_items: usize,
    pub items_by_rarity: BTreeMap<Rarity, usize>,
    /// Users who have drawn at least once
    pub active_drawers: usize,
}

impl Ledger {
    pub fn get(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.get(user_id)
    }

    pub fn get_mut(&mut self, user_id: &str) -> Option<&mut UserRecord> {
        self.users.get_mut(user_id)
    }

    /// Fetch a record, creating an empty one named `display_name` if absent.
    /// A record created without a name (e.g. by an older grant) picks it up here.
    pub fn get_or_create(&mut self, user_id: &str, display_name: &str) -> &mut UserRecord {
        let record = self.users.entry(user_id.to_string()).or_insert_with(|| {
            debug!("Creating ledger record for {}", user_id);
            UserRecord::new(display_name)
        });
        if record.display_name.is_empty() {
            record.display_name = display_name.to_string();
        }
        record
    }

    pub fn put(&mut self, user_id: impl Into<String>, record: UserRecord) {
        self.users.insert(user_id.into(), record);
    }

    /// Append an item; returns how many same-named items were owned before
    pub fn add_item(&mut self, user_id: &str, item: OwnedItem) -> usize {
        let record = self.users.entry(user_id.to_string()).or_default();
        let prior = record.count_named(&item.name);
        record.collection.push(item);
        prior
    }

    /// Remove every item whose name matches case-insensitively.
    /// Returns the number removed; zero means nothing changed.
    pub fn remove_items(&mut self, user_id: &str, name: &str) -> usize {
        let Some(record) = self.users.get_mut(user_id) else {
            return 0;
        };
        let before = record.collection.len();
        record.collection.retain(|item| !item.name_matches(name));
        before - record.collection.len()
    }

    /// Resolve a chat handle to a user id by display name, ignoring case and
    /// a leading `@`. First match in key order wins.
    pub fn find_by_handle(&self, handle: &str) -> Option<(&str, &UserRecord)> {
        let wanted = handle.trim().trim_start_matches('@').to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.users
            .iter()
            .find(|(_, record)| record.display_name.to_lowercase() == wanted)
            .map(|(id, record)| (id.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &UserRecord)> {
        self.users.iter()
    }

    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats {
            total_users: self.users.len(),
            ..LedgerStats::default()
        };
        for record in self.users.values() {
            stats.total_items += record.collection.len();
            if record.last_draw_at.is_some() {
                stats.active_drawers += 1;
            }
            for item in &record.collection {
                *stats.items_by_rarity.entry(item.rarity).or_insert(0) += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::ItemDefinition;

    pub(crate) fn owned(name: &str, rarity: Rarity) -> OwnedItem {
        OwnedItem::from_definition(
            &ItemDefinition {
                name: name.into(),
                rarity,
                kind: "Paramecia".into(),
                damage: 10.0,
                health: None,
            },
            None,
        )
    }

    #[test]
    fn test_get_or_create_is_lazy_and_keeps_existing() {
        let mut ledger = Ledger::default();
        assert!(ledger.get("1").is_none());

        ledger.get_or_create("1", "alice").collection.push(owned("A", Rarity::Common));
        let again = ledger.get_or_create("1", "renamed");
        assert_eq!(again.display_name, "alice");
        assert_eq!(again.collection.len(), 1);
        assert!(again.last_draw_at.is_none());
    }

    #[test]
    fn test_get_or_create_fills_missing_name() {
        let mut ledger = Ledger::default();
        ledger.add_item("1", owned("A", Rarity::Common));
        assert_eq!(ledger.get("1").unwrap().display_name, "");
        assert_eq!(ledger.get_or_create("1", "alice").display_name, "alice");
    }

    #[test]
    fn test_add_item_counts_prior_copies() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.add_item("1", owned("Flame-Flame Fruit", Rarity::Rare)), 0);
        assert_eq!(ledger.add_item("1", owned("Chop-Chop Fruit", Rarity::Uncommon)), 0);
        assert_eq!(ledger.add_item("1", owned("Flame-Flame Fruit", Rarity::Rare)), 1);
        assert_eq!(ledger.get("1").unwrap().collection.len(), 3);
    }

    #[test]
    fn test_remove_items_removes_every_match() {
        let mut ledger = Ledger::default();
        ledger.add_item("1", owned("Flame-Flame Fruit", Rarity::Rare));
        ledger.add_item("1", owned("Chop-Chop Fruit", Rarity::Uncommon));
        ledger.add_item("1", owned("Flame-Flame Fruit", Rarity::Rare));

        assert_eq!(ledger.remove_items("1", "FLAME-flame fruit"), 2);
        let names: Vec<_> = ledger.get("1").unwrap().collection.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Chop-Chop Fruit"]);
    }

    #[test]
    fn test_remove_items_no_match_is_noop() {
        let mut ledger = Ledger::default();
        ledger.add_item("1", owned("Chop-Chop Fruit", Rarity::Uncommon));
        let before = ledger.clone();

        assert_eq!(ledger.remove_items("1", "Gum-Gum Fruit"), 0);
        assert_eq!(ledger.remove_items("missing", "Chop-Chop Fruit"), 0);
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_find_by_handle() {
        let mut ledger = Ledger::default();
        ledger.get_or_create("1", "Alice");
        ledger.get_or_create("2", "bob_the_builder");

        assert_eq!(ledger.find_by_handle("@alice").map(|(id, _)| id), Some("1"));
        assert_eq!(ledger.find_by_handle("BOB_THE_BUILDER").map(|(id, _)| id), Some("2"));
        assert!(ledger.find_by_handle("@carol").is_none());
        assert!(ledger.find_by_handle("@").is_none());
    }

    #[test]
    fn test_find_by_handle_first_match_wins() {
        let mut ledger = Ledger::default();
        ledger.get_or_create("20", "twin");
        ledger.get_or_create("10", "Twin");
        assert_eq!(ledger.find_by_handle("twin").map(|(id, _)| id), Some("10"));
    }

    #[test]
    fn test_stats() {
        let mut ledger = Ledger::default();
        ledger.add_item("1", owned("A", Rarity::Common));
        ledger.add_item("1", owned("B", Rarity::Rare));
        ledger.add_item("2", owned("C", Rarity::Common));
        ledger.get_mut("2").unwrap().last_draw_at = Some(chrono::Utc::now());

        let stats = ledger.stats();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.active_drawers, 1);
        assert_eq!(stats.items_by_rarity.get(&Rarity::Common), Some(&2));
        assert_eq!(stats.items_by_rarity.get(&Rarity::Mythical), None);
    }

    #[test]
    fn test_document_shape() {
        let mut ledger = Ledger::default();
        ledger.get_or_create("42", "alice");
        let value = serde_json::to_value(&ledger).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "users": {
                    "42": { "last_spin": null, "inventory": [], "username": "alice" }
                }
            })
        );
    }
}
