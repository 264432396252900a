//! Commerce platform seam.
//!
//! The pipeline talks to the store only through [`CommerceClient`]. Two
//! backends exist: `ShopifyClient` for the live admin API and
//! `InMemoryCommerce` for dry runs.

pub mod memory;
pub mod shopify;

use crate::errors::CommerceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::model::fulfillment::StoreProduct;
use common::model::pledge::{RawPledgeRow, ShippingAddress};
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

pub use memory::InMemoryCommerce;
pub use shopify::ShopifyClient;

/// Tag put on every customer created for a backer.
pub const BACKER_TAG: &str = "kickstarter-backer";

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: u64,
    pub email: String,
}

/// Everything needed to create a customer record for a backer.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tags: Vec<String>,
    pub note: String,
    pub address: ShippingAddress,
}

impl CustomerProfile {
    pub fn from_row(row: &RawPledgeRow) -> Self {
        let (first_name, last_name) = split_name(&row.name);
        let mut tags = vec![BACKER_TAG.to_string()];
        let tier = tier_tag(&row.reward_title);
        if !tier.is_empty() {
            tags.push(tier);
        }
        Self {
            email: row.email.clone(),
            first_name,
            last_name,
            tags,
            note: format!("Kickstarter Backer - Order #{} - {}", row.order_id, row.reward_title),
            address: row.shipping_address.clone(),
        }
    }
}

/// A single-use, fixed-amount discount restricted to one customer.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountRequest {
    pub code: String,
    pub title: String,
    pub customer_id: u64,
    pub amount: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[async_trait]
pub trait CommerceClient: Send + Sync {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, CommerceError>;

    async fn create_customer(&self, profile: &CustomerProfile) -> Result<Customer, CommerceError>;

    /// Issues the discount and returns the code as registered by the store.
    async fn create_one_time_discount(&self, request: &DiscountRequest) -> Result<String, CommerceError>;

    async fn list_products(&self) -> Result<Vec<StoreProduct>, CommerceError>;
}

/// Splits at the first space: `"Ada King Lovelace"` -> `("Ada", "King Lovelace")`.
pub fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

/// Reward title as a customer tag: `"Early Bird Special"` -> `"early-bird-special"`.
pub fn tier_tag(reward_title: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"));
    whitespace
        .replace_all(reward_title.trim(), "-")
        .replace(',', "")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Ada King Lovelace"), ("Ada".to_string(), "King Lovelace".to_string()));
        assert_eq!(split_name("Prince"), ("Prince".to_string(), String::new()));
    }

    #[test]
    fn test_tier_tag() {
        assert_eq!(tier_tag("Early Bird  Special"), "early-bird-special");
        assert_eq!(tier_tag("Black, Engraved"), "black-engraved");
        assert_eq!(tier_tag(""), "");
    }

    #[test]
    fn test_profile_from_row() {
        let row = RawPledgeRow {
            backer_id: "5001".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada Lovelace".to_string(),
            pledge_amount: Decimal::new(139, 0),
            reward_title: "Early Bird".to_string(),
            order_id: "17".to_string(),
            shipping_address: ShippingAddress::default(),
            custom_engraving: None,
            fulfillment_status: None,
            pledged_at: None,
            raw_counts: Default::default(),
        };

        let profile = CustomerProfile::from_row(&row);
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.last_name, "Lovelace");
        assert_eq!(profile.tags, vec!["kickstarter-backer".to_string(), "early-bird".to_string()]);
        assert_eq!(profile.note, "Kickstarter Backer - Order #17 - Early Bird");
    }
}
