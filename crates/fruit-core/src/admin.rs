//! ============================================================================
//! Admin Operations - Grant, revoke and list the catalog
//! ============================================================================
//! Pure ledger/catalog operations. The dispatcher checks the allow-list
//! before calling any of these and persists the ledger afterwards.
//! ============================================================================

use tracing::info;

use crate::catalog::Catalog;
use crate::draw::DrawOutcome;
use crate::ledger::Ledger;
use crate::types::{BotError, OwnedItem};

/// Result of a successful revoke
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revoked {
    pub user_id: String,
    pub removed: usize,
}

/// Give the requester a named fruit, bypassing the cooldown.
/// Granted copies carry no `obtained` timestamp.
pub fn grant(
    ledger: &mut Ledger,
    catalog: &Catalog,
    user_id: &str,
    display_name: &str,
    item_name: &str,
) -> Result<DrawOutcome, BotError> {
    let item_name = item_name.trim();
    if item_name.is_empty() {
        return Err(BotError::MalformedCommand("missing item name".into()));
    }

    let item = catalog
        .find_by_name(item_name)
        .cloned()
        .ok_or_else(|| BotError::ItemNotFound(item_name.to_string()))?;

    let record = ledger.get_or_create(user_id, display_name);
    let prior_copies = record.count_named(&item.name);
    record.collection.push(OwnedItem::from_definition(&item, None));

    info!("Granted {} to operator {}", item.name, user_id);
    Ok(DrawOutcome { item, prior_copies })
}

/// Take every copy of `item_name` away from the user known as `handle`
pub fn revoke(ledger: &mut Ledger, handle: &str, item_name: &str) -> Result<Revoked, BotError> {
    let user_id = ledger
        .find_by_handle(handle)
        .map(|(id, _)| id.to_string())
        .ok_or_else(|| BotError::UserNotFound(handle.to_string()))?;

    let removed = ledger.remove_items(&user_id, item_name);
    if removed == 0 {
        return Err(BotError::ItemNotFound(item_name.to_string()));
    }

    info!("Revoked {} x '{}' from {} ({})", removed, item_name, handle, user_id);
    Ok(Revoked { user_id, removed })
}

/// Full catalog grouped by rarity, one "- name (type)" line per fruit
pub fn catalog_listing(catalog: &Catalog) -> String {
    let mut lines = vec!["📜 Все доступные карты:\n".to_string()];
    for (rarity, items) in catalog.tiers() {
        lines.push(format!("\n🔮 {} 🔮", rarity));
        lines.extend(items.iter().map(|item| format!("- {} ({})", item.name, item.kind)));
    }
    lines.join("\n")
}
