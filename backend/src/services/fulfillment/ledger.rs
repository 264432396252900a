//! Results of the current run.
//!
//! One `FulfillmentResult` per processed backer, in processing order. The
//! ledger is replaced when a new run starts and is the source for the
//! results endpoint, the CSV export and token lookups.

use common::model::fulfillment::{FulfillmentResult, LedgerSummary};
use rust_decimal::Decimal;

/// Append-only record of one run's outcomes.
#[derive(Debug, Default)]
pub struct ResultLedger {
    results: Vec<FulfillmentResult>,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: FulfillmentResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[FulfillmentResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The successful result issued to `backer_id` with exactly this code.
    pub fn find_success(&self, backer_id: &str, discount_code: &str) -> Option<&FulfillmentResult> {
        self.results.iter().find(|r| {
            r.backer_id == backer_id
                && r.success().is_some_and(|s| s.discount_code == discount_code)
        })
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary {
            total_processed: self.results.len(),
            total_pledge_amount: Decimal::ZERO,
            ..Default::default()
        };
        for result in &self.results {
            if result.success().is_some() {
                summary.successful += 1;
            } else {
                summary.failed += 1;
            }
            summary.total_pledge_amount += result.pledge_amount;
            if !result.reward_title.is_empty() && !summary.reward_tiers.contains(&result.reward_title) {
                summary.reward_tiers.push(result.reward_title.clone());
            }
            if result.has_unmatched() {
                summary.items_missing += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use common::model::fulfillment::{FulfillmentOutcome, FulfillmentSuccess, UnmatchedItem};

    pub(crate) fn success(backer_id: &str, code: &str, tier: &str, unmatched: usize) -> FulfillmentResult {
        FulfillmentResult {
            backer_id: backer_id.to_string(),
            email: format!("{}@example.com", backer_id),
            name: format!("Backer {}", backer_id),
            pledge_amount: Decimal::new(13950, 2),
            reward_title: tier.to_string(),
            order_id: backer_id.to_string(),
            custom_engraving: None,
            outcome: FulfillmentOutcome::Success(FulfillmentSuccess {
                customer_id: 1,
                discount_code: code.to_string(),
                landing_page_url: format!("http://localhost:3000/fulfillment/{}", backer_id),
                cart_link: "https://shop.example/cart/111:1".to_string(),
                checkout_link: format!("https://shop.example/cart/111:1?discount={}", code),
                items_found: 1,
                items_total: 1 + unmatched,
                unmatched: (0..unmatched)
                    .map(|i| UnmatchedItem {
                        name: format!("Extra {}", i),
                        source_key: format!("extra{}", i),
                        quantity: 1,
                    })
                    .collect(),
            }),
        }
    }

    pub(crate) fn failure(backer_id: &str, reason: &str) -> FulfillmentResult {
        FulfillmentResult {
            outcome: FulfillmentOutcome::Error {
                reason: reason.to_string(),
            },
            ..success(backer_id, "", "Backer", 0)
        }
    }

    #[test]
    fn test_summary() {
        let mut ledger = ResultLedger::new();
        ledger.append(success("1", "KS1_000000001", "Early Bird", 0));
        ledger.append(failure("2", "discount issuance failed"));
        ledger.append(success("3", "KS3_000000003", "Early Bird", 2));
        ledger.append(success("4", "KS4_000000004", "", 0));

        let summary = ledger.summary();
        assert_eq!(summary.total_processed, 4);
        assert_eq!(summary.successful, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_pledge_amount, Decimal::new(55800, 2));
        assert_eq!(summary.reward_tiers, vec!["Early Bird".to_string(), "Backer".to_string()]);
        assert_eq!(summary.items_missing, 1);
    }

    #[test]
    fn test_find_success_requires_matching_code() {
        let mut ledger = ResultLedger::new();
        ledger.append(success("1", "KS1_000000001", "Early Bird", 0));
        ledger.append(failure("2", "customer lookup failed"));

        assert!(ledger.find_success("1", "KS1_000000001").is_some());
        assert!(ledger.find_success("1", "KS1_999999999").is_none());
        assert!(ledger.find_success("2", "").is_none());
    }

    #[test]
    fn test_empty_summary() {
        let summary = ResultLedger::new().summary();
        assert_eq!(summary, LedgerSummary::default());
    }
}
