//! Pledge allocation: raw per-column counts to canonical catalog items.
//!
//! The passes run in a fixed order over a private copy of the counts:
//!
//! 1. combination rules, in declared priority order, each consuming
//!    `min(primary, secondary)` from both keys;
//! 2. default-variant fallbacks for keys with leftover quantity;
//! 3. standalone entries for whatever remains;
//! 4. anything still left is emitted unmapped (no variant id).
//!
//! The order of the returned items follows the passes and is relied on by the
//! landing page and the export.

use crate::engine::catalog::CatalogTable;
use common::model::catalog::CatalogEntry;
use common::model::item::{AllocationReason, CanonicalPledgedItem};
use common::model::pledge::RawCounts;
use log::debug;

pub fn allocate(raw_counts: &RawCounts, catalog: &CatalogTable) -> Vec<CanonicalPledgedItem> {
    let mut counts = raw_counts.clone();
    let mut items = Vec::new();

    for rule in catalog.combinations() {
        let primary = remaining(&counts, &rule.primary);
        let secondary = remaining(&counts, &rule.secondary);
        let used = primary.min(secondary);
        if used == 0 {
            continue;
        }
        let Some(entry) = catalog.entry(&rule.target) else {
            continue;
        };
        let mut item = catalog_item(entry, used, AllocationReason::Combination, &rule.primary);
        item.paired_key = Some(rule.secondary.clone());
        items.push(item);
        consume(&mut counts, &rule.primary, used);
        consume(&mut counts, &rule.secondary, used);
    }

    for rule in catalog.defaults() {
        let left = remaining(&counts, &rule.key);
        if left == 0 {
            continue;
        }
        if let Some(entry) = catalog.entry(&rule.target) {
            items.push(catalog_item(entry, left, AllocationReason::DefaultVariant, &rule.key));
            consume(&mut counts, &rule.key, left);
        }
    }

    let order = key_order(&counts, catalog);

    for key in &order {
        let left = remaining(&counts, key);
        if left == 0 {
            continue;
        }
        if let Some(entry) = catalog.standalone_entry(key) {
            items.push(catalog_item(entry, left, AllocationReason::Standalone, key));
            consume(&mut counts, key, left);
        }
    }

    for key in &order {
        let left = remaining(&counts, key);
        if left == 0 {
            continue;
        }
        debug!("no catalog entry for {} (x{})", key, left);
        items.push(CanonicalPledgedItem {
            display_name: catalog.fallback_name(key),
            variant_id: None,
            quantity: left,
            allocation_reason: AllocationReason::Unmapped,
            source_key: key.clone(),
            paired_key: None,
            unit_price: None,
        });
        consume(&mut counts, key, left);
    }

    items
}

fn remaining(counts: &RawCounts, key: &str) -> u32 {
    counts.get(key).copied().unwrap_or(0)
}

fn consume(counts: &mut RawCounts, key: &str, quantity: u32) {
    if let Some(count) = counts.get_mut(key) {
        *count = count.saturating_sub(quantity);
    }
}

fn catalog_item(
    entry: &CatalogEntry,
    quantity: u32,
    reason: AllocationReason,
    source_key: &str,
) -> CanonicalPledgedItem {
    CanonicalPledgedItem {
        display_name: entry.display_name.clone(),
        variant_id: Some(entry.variant_id.clone()),
        quantity,
        allocation_reason: reason,
        source_key: source_key.to_string(),
        paired_key: None,
        unit_price: Some(entry.unit_price),
    }
}

/// Declared keys in column order, then any undeclared keys present in the counts.
fn key_order(counts: &RawCounts, catalog: &CatalogTable) -> Vec<String> {
    let mut order: Vec<String> = catalog.raw_keys().map(str::to_string).collect();
    for key in counts.keys() {
        if !order.contains(key) {
            order.push(key.clone());
        }
    }
    order
}
