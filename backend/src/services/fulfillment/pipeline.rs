//! Per-backer fulfillment and the paced batch loop around it.
//!
//! For one backer the steps run in order: customer resolution (lookup before
//! create), discount issuance, link synthesis. Any failing step turns the
//! backer into an `error` result; the batch itself never stops on a backer.

use crate::config::PipelineSettings;
use crate::errors::{CommerceError, StepError};
use crate::services::commerce::{CommerceClient, Customer, CustomerProfile, DiscountRequest};
use crate::services::fulfillment::directory::BackerRecord;
use crate::services::fulfillment::ledger::ResultLedger;
use crate::services::fulfillment::links::{
    discount_code, encode_token, landing_page_url, CartLinks,
};
use chrono::{Duration as ChronoDuration, Utc};
use common::model::fulfillment::{
    FulfillmentOutcome, FulfillmentResult, FulfillmentSuccess, UnmatchedItem,
};
use common::model::pledge::RawPledgeRow;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Progress of a running batch, reported after every backer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            100
        } else {
            (self.processed * 100 / self.total) as u32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchReport {
    pub processed: usize,
    pub cancelled: bool,
}

pub struct FulfillmentPipeline {
    client: Arc<dyn CommerceClient>,
    settings: PipelineSettings,
}

impl FulfillmentPipeline {
    pub fn new(client: Arc<dyn CommerceClient>, settings: PipelineSettings) -> Self {
        Self { client, settings }
    }

    pub async fn process_backer(&self, record: &BackerRecord) -> FulfillmentResult {
        let row = &record.row;
        let outcome = match self.fulfill(record).await {
            Ok(success) => {
                info!(
                    "Backer {} fulfilled: {} ({}/{} items matched)",
                    row.backer_id, success.discount_code, success.items_found, success.items_total
                );
                FulfillmentOutcome::Success(success)
            }
            Err(e) => {
                warn!("Backer {} failed: {}", row.backer_id, e);
                FulfillmentOutcome::Error {
                    reason: e.to_string(),
                }
            }
        };
        FulfillmentResult {
            backer_id: row.backer_id.clone(),
            email: row.email.clone(),
            name: row.name.clone(),
            pledge_amount: row.pledge_amount,
            reward_title: row.reward_title.clone(),
            order_id: row.order_id.clone(),
            custom_engraving: row.custom_engraving.clone(),
            outcome,
        }
    }

    /// Runs every record in order, appending one result per backer to the
    /// ledger. Cancellation is honoured between backers only.
    pub async fn run_batch<F>(
        &self,
        records: &[BackerRecord],
        ledger: &RwLock<ResultLedger>,
        cancel: &AtomicBool,
        mut on_progress: F,
    ) -> BatchReport
    where
        F: FnMut(BatchProgress),
    {
        let total = records.len();
        info!("Starting batch of {} backers", total);

        for (i, record) in records.iter().enumerate() {
            if i > 0 && !self.settings.pacing_interval.is_zero() {
                debug!("Pacing {} ms", self.settings.pacing_interval.as_millis());
                tokio::time::sleep(self.settings.pacing_interval).await;
            }
            if cancel.load(Ordering::SeqCst) {
                info!("Batch cancelled after {} of {} backers", i, total);
                return BatchReport {
                    processed: i,
                    cancelled: true,
                };
            }

            let result = self.process_backer(record).await;
            ledger.write().await.append(result);
            on_progress(BatchProgress {
                processed: i + 1,
                total,
            });
        }

        info!("Batch finished: {} backers processed", total);
        BatchReport {
            processed: total,
            cancelled: false,
        }
    }

    async fn fulfill(&self, record: &BackerRecord) -> Result<FulfillmentSuccess, StepError> {
        let row = &record.row;
        if record.items.is_empty() {
            debug!(
                "Backer {} has no pledged items ({} raw units), issuing discount only",
                row.backer_id,
                row.total_raw_quantity()
            );
        }

        let customer = self.resolve_customer(row).await?;

        let now = Utc::now();
        let request = DiscountRequest {
            code: discount_code(row.code_identity(), now),
            title: format!("Kickstarter Pledge - {}", row.name),
            customer_id: customer.id,
            amount: row.pledge_amount,
            starts_at: now,
            ends_at: now + ChronoDuration::days(self.settings.discount_validity_days),
        };
        let code = self
            .bounded("discount issuance", self.client.create_one_time_discount(&request))
            .await?
            .map_err(StepError::Discount)?;

        let links = CartLinks::build(&self.settings.shop_domain, &record.items, &code);
        let token = encode_token(&row.backer_id, &code);
        let unmatched: Vec<UnmatchedItem> = record
            .items
            .iter()
            .filter(|item| !item.is_matched())
            .map(UnmatchedItem::from_item)
            .collect();

        Ok(FulfillmentSuccess {
            customer_id: customer.id,
            landing_page_url: landing_page_url(&self.settings.base_url, &token),
            cart_link: links.cart_link,
            checkout_link: links.checkout_link,
            items_found: record.items.len() - unmatched.len(),
            items_total: record.items.len(),
            unmatched,
            discount_code: code,
        })
    }

    async fn resolve_customer(&self, row: &RawPledgeRow) -> Result<Customer, StepError> {
        let existing = self
            .bounded("customer lookup", self.client.find_customer_by_email(&row.email))
            .await?
            .map_err(StepError::CustomerLookup)?;
        if let Some(customer) = existing {
            debug!("Reusing customer {} for {}", customer.id, row.email);
            return Ok(customer);
        }

        let profile = CustomerProfile::from_row(row);
        self.bounded("customer creation", self.client.create_customer(&profile))
            .await?
            .map_err(StepError::CustomerCreate)
    }

    async fn bounded<T, F>(&self, step: &'static str, call: F) -> Result<Result<T, CommerceError>, StepError>
    where
        F: Future<Output = Result<T, CommerceError>>,
    {
        tokio::time::timeout(self.settings.call_timeout, call)
            .await
            .map_err(|_| StepError::Timeout {
                step,
                millis: self.settings.call_timeout.as_millis() as u64,
            })
    }
}
