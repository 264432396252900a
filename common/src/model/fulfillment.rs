//! Outcome records produced by the fulfillment pipeline and the read models
//! served from them.

use crate::model::item::CanonicalPledgedItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    Success,
    Error,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Success => "success",
            FulfillmentStatus::Error => "error",
        }
    }
}

/// A pledged item that has no catalog variant and needs operator follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedItem {
    pub name: String,
    pub source_key: String,
    pub quantity: u32,
}

impl UnmatchedItem {
    pub fn from_item(item: &CanonicalPledgedItem) -> Self {
        Self {
            name: item.display_name.clone(),
            source_key: item.source_key.clone(),
            quantity: item.quantity,
        }
    }
}

/// Everything a successful pipeline run hands back to the backer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentSuccess {
    pub customer_id: u64,
    pub discount_code: String,
    pub landing_page_url: String,
    pub cart_link: String,
    pub checkout_link: String,
    pub items_found: usize,
    pub items_total: usize,
    pub unmatched: Vec<UnmatchedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FulfillmentOutcome {
    Success(FulfillmentSuccess),
    Error { reason: String },
}

/// Terminal record for one backer in one run. Never modified once appended to
/// the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentResult {
    pub backer_id: String,
    pub email: String,
    pub name: String,
    pub pledge_amount: Decimal,
    pub reward_title: String,
    pub order_id: String,
    pub custom_engraving: Option<String>,
    #[serde(flatten)]
    pub outcome: FulfillmentOutcome,
}

impl FulfillmentResult {
    pub fn status(&self) -> FulfillmentStatus {
        match self.outcome {
            FulfillmentOutcome::Success(_) => FulfillmentStatus::Success,
            FulfillmentOutcome::Error { .. } => FulfillmentStatus::Error,
        }
    }

    pub fn success(&self) -> Option<&FulfillmentSuccess> {
        match &self.outcome {
            FulfillmentOutcome::Success(success) => Some(success),
            FulfillmentOutcome::Error { .. } => None,
        }
    }

    pub fn error_reason(&self) -> Option<&str> {
        match &self.outcome {
            FulfillmentOutcome::Success(_) => None,
            FulfillmentOutcome::Error { reason } => Some(reason),
        }
    }

    pub fn has_unmatched(&self) -> bool {
        self.success().is_some_and(|s| !s.unmatched.is_empty())
    }

    /// `found/total` as written to the export.
    pub fn items_found_label(&self) -> String {
        self.success()
            .map(|s| format!("{}/{}", s.items_found, s.items_total))
            .unwrap_or_default()
    }

    /// Unmatched items as `name (source_key)`, comma separated.
    pub fn unmatched_description(&self) -> String {
        self.success()
            .map(|s| {
                s.unmatched
                    .iter()
                    .map(|item| format!("{} ({})", item.name, item.source_key))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default()
    }
}

/// Aggregate view over the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_pledge_amount: Decimal,
    pub reward_tiers: Vec<String>,
    pub items_missing: usize,
}

/// A pledged item as shown on the backer's landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedItem {
    #[serde(flatten)]
    pub item: CanonicalPledgedItem,
    pub line_total: Option<Decimal>,
}

/// Payload returned by the token lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackerView {
    pub name: String,
    pub pledge_amount: Decimal,
    pub reward_title: String,
    pub pledged_items: Vec<PricedItem>,
    pub discount_code: String,
    pub landing_page_url: String,
    pub cart_link: String,
    pub checkout_link: String,
    pub items_found: usize,
    pub items_total: usize,
    pub shop_domain: String,
    pub custom_engraving: Option<String>,
    pub order_id: String,
}

/// A storefront variant flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub name: String,
    pub price: Decimal,
    pub variant_id: String,
    pub description: String,
    pub handle: String,
    pub image: Option<String>,
}
