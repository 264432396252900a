//! Process-local commerce backend for dry runs.
//!
//! Customers are kept by lower-cased email and every issued discount is
//! recorded, so a whole batch can be rehearsed without touching the store.

use super::{CommerceClient, Customer, CustomerProfile, DiscountRequest};
use crate::engine::CatalogTable;
use crate::errors::CommerceError;
use async_trait::async_trait;
use common::model::fulfillment::StoreProduct;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryCommerce {
    customers: RwLock<HashMap<String, Customer>>,
    discounts: RwLock<Vec<DiscountRequest>>,
    products: Vec<StoreProduct>,
    next_id: AtomicU64,
    rejected_emails: RwLock<HashSet<String>>,
    latency: Option<Duration>,
}

impl InMemoryCommerce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storefront listing made of the catalog's own entries.
    pub fn with_catalog(catalog: &CatalogTable) -> Self {
        let products = catalog
            .document()
            .entries
            .iter()
            .map(|(key, entry)| StoreProduct {
                name: entry.display_name.clone(),
                price: entry.unit_price,
                variant_id: entry.variant_id.clone(),
                description: "No description available".to_string(),
                handle: key.replace('_', "-"),
                image: None,
            })
            .collect();
        Self {
            products,
            ..Self::default()
        }
    }

    /// Delays every call, as a slow store would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes discount issuance fail for this customer email.
    pub async fn reject_discounts_for(&self, email: &str) {
        self.rejected_emails.write().await.insert(email.to_lowercase());
    }

    pub async fn customer_count(&self) -> usize {
        self.customers.read().await.len()
    }

    pub async fn issued_discounts(&self) -> Vec<DiscountRequest> {
        self.discounts.read().await.clone()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl CommerceClient for InMemoryCommerce {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, CommerceError> {
        self.simulate_latency().await;
        Ok(self.customers.read().await.get(&email.to_lowercase()).cloned())
    }

    async fn create_customer(&self, profile: &CustomerProfile) -> Result<Customer, CommerceError> {
        self.simulate_latency().await;
        let mut customers = self.customers.write().await;
        let key = profile.email.to_lowercase();
        if customers.contains_key(&key) {
            return Err(CommerceError::Rejected {
                status: 422,
                body: format!("email {} has already been taken", profile.email),
            });
        }
        let customer = Customer {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            email: profile.email.clone(),
        };
        debug!("Dry run: created customer {} for {}", customer.id, customer.email);
        customers.insert(key, customer.clone());
        Ok(customer)
    }

    async fn create_one_time_discount(&self, request: &DiscountRequest) -> Result<String, CommerceError> {
        self.simulate_latency().await;
        let owner = self
            .customers
            .read()
            .await
            .values()
            .find(|c| c.id == request.customer_id)
            .map(|c| c.email.to_lowercase());
        let Some(owner) = owner else {
            return Err(CommerceError::Rejected {
                status: 422,
                body: format!("unknown customer {}", request.customer_id),
            });
        };
        if self.rejected_emails.read().await.contains(&owner) {
            return Err(CommerceError::Rejected {
                status: 422,
                body: "price rule could not be created".to_string(),
            });
        }
        debug!("Dry run: issued discount {} for {}", request.code, owner);
        self.discounts.write().await.push(request.clone());
        Ok(request.code.clone())
    }

    async fn list_products(&self) -> Result<Vec<StoreProduct>, CommerceError> {
        Ok(self.products.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::tests::ambient_catalog;
    use chrono::Utc;
    use common::model::pledge::ShippingAddress;
    use rust_decimal::Decimal;

    fn profile(email: &str) -> CustomerProfile {
        CustomerProfile {
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            tags: vec![],
            note: String::new(),
            address: ShippingAddress::default(),
        }
    }

    #[tokio::test]
    async fn test_find_is_case_insensitive() {
        let commerce = InMemoryCommerce::new();
        let created = commerce.create_customer(&profile("Ada@Example.com")).await.unwrap();

        let found = commerce.find_customer_by_email("ada@example.com").await.unwrap();
        assert_eq!(found, Some(created));
        assert!(commerce.create_customer(&profile("ada@example.com")).await.is_err());
        assert_eq!(commerce.customer_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_discount() {
        let commerce = InMemoryCommerce::new();
        let customer = commerce.create_customer(&profile("ada@example.com")).await.unwrap();
        commerce.reject_discounts_for("ADA@example.com").await;

        let request = DiscountRequest {
            code: "KS1_000000001".to_string(),
            title: "Kickstarter Pledge - Ada".to_string(),
            customer_id: customer.id,
            amount: Decimal::new(10, 0),
            starts_at: Utc::now(),
            ends_at: Utc::now(),
        };
        let err = commerce.create_one_time_discount(&request).await.unwrap_err();
        assert!(matches!(err, CommerceError::Rejected { status: 422, .. }));
        assert!(commerce.issued_discounts().await.is_empty());
    }

    #[tokio::test]
    async fn test_products_from_catalog() {
        let commerce = InMemoryCommerce::with_catalog(&ambient_catalog());
        let products = commerce.list_products().await.unwrap();

        assert_eq!(products.len(), 5);
        assert!(products
            .iter()
            .any(|p| p.variant_id == "52337643290957" && p.handle == "ambientone-black"));
    }
}
