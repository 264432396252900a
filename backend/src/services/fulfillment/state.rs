//! Shared state of the fulfillment service.
//!
//! Created once in `main.rs` and shared with every handler as `web::Data`.
//! The backer directory is replaced when a run starts; the ledger is reset at
//! the same moment and only appended to afterwards.

use crate::config::AppConfig;
use crate::engine::CatalogTable;
use crate::services::commerce::CommerceClient;
use crate::services::fulfillment::directory::BackerDirectory;
use crate::services::fulfillment::ledger::ResultLedger;
use crate::services::fulfillment::pipeline::FulfillmentPipeline;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct FulfillmentState {
    pub config: AppConfig,
    pub catalog: Arc<CatalogTable>,
    pub client: Arc<dyn CommerceClient>,
    pub directory: RwLock<Arc<BackerDirectory>>,
    pub ledger: RwLock<ResultLedger>,
    cancel_requested: AtomicBool,
    running: AtomicBool,
}

impl FulfillmentState {
    pub fn new(config: AppConfig, catalog: Arc<CatalogTable>, client: Arc<dyn CommerceClient>) -> Self {
        Self {
            config,
            catalog,
            client,
            directory: RwLock::new(Arc::new(BackerDirectory::default())),
            ledger: RwLock::new(ResultLedger::new()),
            cancel_requested: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    pub fn pipeline(&self) -> FulfillmentPipeline {
        FulfillmentPipeline::new(self.client.clone(), self.config.pipeline.clone())
    }

    /// Claims the single batch slot. Returns `false` if a batch already runs.
    pub fn try_begin_run(&self) -> bool {
        let claimed = self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if claimed {
            self.cancel_requested.store(false, Ordering::SeqCst);
        }
        claimed
    }

    pub fn finish_run(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Asks the running batch to stop before its next backer.
    pub fn request_cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel_requested.store(true, Ordering::SeqCst);
        true
    }

    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel_requested
    }

    /// Installs the backers of a new run and starts a fresh ledger.
    pub async fn begin_ledger(&self, directory: BackerDirectory) -> Arc<BackerDirectory> {
        let directory = Arc::new(directory);
        *self.directory.write().await = directory.clone();
        *self.ledger.write().await = ResultLedger::new();
        directory
    }
}
