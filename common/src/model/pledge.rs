//! A backer's pledge as exported by Kickstarter: identity, amount, shipping
//! address and the raw per-column item quantities before allocation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quantities keyed by raw item key, one entry per recognised export column.
///
/// Values are never negative: empty or malformed cells are stored as `0`.
pub type RawCounts = BTreeMap<String, u32>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub province: String,
    pub zip: String,
    pub country: String,
    pub country_code: String,
    pub phone: String,
}

/// One backer as read from the pledge export.
///
/// Built once at load time and never mutated afterwards; the backer directory
/// keys these by `backer_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPledgeRow {
    pub backer_id: String,
    pub email: String,
    pub name: String,
    pub pledge_amount: Decimal,
    pub reward_title: String,
    pub order_id: String,
    pub shipping_address: ShippingAddress,
    pub custom_engraving: Option<String>,
    pub fulfillment_status: Option<String>,
    pub pledged_at: Option<String>,
    pub raw_counts: RawCounts,
}

impl RawPledgeRow {
    /// Identity used in discount codes: the order number when the export has one.
    pub fn code_identity(&self) -> &str {
        if self.order_id.trim().is_empty() {
            &self.backer_id
        } else {
            &self.order_id
        }
    }

    /// Sum of every raw quantity; `0` means the backer pledged no items.
    pub fn total_raw_quantity(&self) -> u64 {
        self.raw_counts.values().map(|&q| u64::from(q)).sum()
    }
}
