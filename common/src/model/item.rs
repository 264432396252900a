use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an item ended up in a backer's list. Items are always emitted in the
/// order of this enum's variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationReason {
    Combination,
    DefaultVariant,
    Standalone,
    Unmapped,
}

impl fmt::Display for AllocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AllocationReason::Combination => "combination",
            AllocationReason::DefaultVariant => "default-variant",
            AllocationReason::Standalone => "standalone",
            AllocationReason::Unmapped => "unmapped",
        };
        f.write_str(label)
    }
}

/// A catalog-addressable line item derived from a backer's raw counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPledgedItem {
    pub display_name: String,
    /// `None` when no catalog entry matched the source key.
    pub variant_id: Option<String>,
    pub quantity: u32,
    pub allocation_reason: AllocationReason,
    pub source_key: String,
    /// Second raw key consumed by a combination rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_key: Option<String>,
    pub unit_price: Option<Decimal>,
}

impl CanonicalPledgedItem {
    pub fn is_matched(&self) -> bool {
        self.variant_id.is_some()
    }

    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.map(|price| price * Decimal::from(self.quantity))
    }

    /// Quantity this item drew from `key`.
    pub fn consumed_from(&self, key: &str) -> u32 {
        let mut consumed = 0;
        if self.source_key == key {
            consumed += self.quantity;
        }
        if self.paired_key.as_deref() == Some(key) {
            consumed += self.quantity;
        }
        consumed
    }
}
