//! # Fulfillment Batch Start Service
//!
//! `POST /api/fulfillment/process` loads a pledge export and runs the
//! fulfillment pipeline over it as a background job.
//!
//! ## Workflow:
//!
//! 1.  **Run slot**: only one batch may run at a time; a second request gets
//!     `409 Conflict`.
//!
//! 2.  **Loading**: the export (the request's `csv_path`, or `PLEDGE_CSV_PATH`)
//!     is parsed and allocated on the blocking pool. An unreadable file or a
//!     header without the required columns fails the request with `400` before
//!     any backer is touched.
//!
//! 3.  **Job scheduling**: the backer directory is replaced, a fresh ledger is
//!     started, a `Pending` job is registered and its id returned at once.
//!
//! 4.  **Background processing**: a Tokio task runs the batch. Progress is
//!     forwarded through a per-job channel to the central job updater as
//!     `InProgress(percent)`.
//!
//! 5.  **Completion**: the ledger is exported, and the job ends as
//!     `Completed`, `Cancelled(processed)` or `Failed` when the export fails.

use crate::errors::BatchError;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::services::data_sources::csv::load::load_export;
use crate::services::fulfillment::directory::BackerDirectory;
use crate::services::fulfillment::export::write_export;
use crate::services::fulfillment::pipeline::BatchProgress;
use crate::services::fulfillment::state::FulfillmentState;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use common::jobs::JobStatus;
use common::requests::StartProcessRequest;
use log::{error, info};
use std::path::PathBuf;
use tokio::sync::mpsc;
use uuid::Uuid;

pub(crate) async fn process(
    jobs: web::Data<JobsState>,
    state: web::Data<FulfillmentState>,
    payload: web::Json<StartProcessRequest>,
) -> impl Responder {
    match schedule_fulfillment_job(jobs, state, payload.into_inner()).await {
        Ok(job_id) => HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id })),
        Err(e @ BatchError::AlreadyRunning) => {
            HttpResponse::Conflict().json(serde_json::json!({ "error": e.to_string() }))
        }
        Err(e @ BatchError::Load(_)) => {
            HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() }))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// `POST /api/fulfillment/cancel`
pub(crate) async fn cancel(state: web::Data<FulfillmentState>) -> impl Responder {
    if state.request_cancel() {
        info!("Cancellation requested");
        HttpResponse::Ok().json(serde_json::json!({ "cancelling": true }))
    } else {
        HttpResponse::Conflict().json(serde_json::json!({ "error": "no fulfillment batch is running" }))
    }
}

async fn schedule_fulfillment_job(
    jobs: web::Data<JobsState>,
    state: web::Data<FulfillmentState>,
    req: StartProcessRequest,
) -> Result<String, BatchError> {
    if !state.try_begin_run() {
        return Err(BatchError::AlreadyRunning);
    }

    let directory = match load_directory(&state, req.csv_path).await {
        Ok(directory) => directory,
        Err(e) => {
            state.finish_run();
            return Err(e);
        }
    };
    let directory = state.begin_ledger(directory).await;

    let job_id = Uuid::new_v4().to_string();
    jobs.register(&job_id).await;
    info!("Scheduled fulfillment job {} for {} backers", job_id, directory.len());

    let tx = jobs.tx.clone();
    let job_id_clone = job_id.clone();
    tokio::spawn(async move {
        // Forward per-backer progress to the central job controller.
        let (progress_tx, mut progress_rx) = mpsc::channel::<BatchProgress>(100);
        let updater_tx = tx.clone();
        let job_id_for_updater = job_id_clone.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                let _ = updater_tx
                    .send(JobUpdate::new(
                        job_id_for_updater.clone(),
                        JobStatus::InProgress(progress.percent()),
                    ))
                    .await;
            }
        });

        let pipeline = state.pipeline();
        let report = pipeline
            .run_batch(directory.records(), &state.ledger, state.cancel_flag(), |progress| {
                let _ = progress_tx.try_send(progress);
            })
            .await;
        drop(progress_tx);
        // progress must not land after the final status
        let _ = forwarder.await;

        let results = state.ledger.read().await.results().to_vec();
        let summary = state.ledger.read().await.summary();
        let results_dir = state.config.results_dir.clone();
        let exported =
            tokio::task::spawn_blocking(move || write_export(&results, &results_dir, Utc::now())).await;

        let status = match exported {
            Ok(Ok(_)) if report.cancelled => JobStatus::Cancelled(report.processed as u32),
            Ok(Ok(_)) => JobStatus::Completed(format!(
                "Processed {} backers: {} succeeded, {} failed",
                summary.total_processed, summary.successful, summary.failed
            )),
            Ok(Err(e)) => {
                error!("Export after job {} failed: {}", job_id_clone, e);
                JobStatus::Failed(e.to_string())
            }
            Err(e) => JobStatus::Failed(format!("Task join error: {}", e)),
        };
        state.finish_run();
        let _ = tx.send(JobUpdate::new(job_id_clone, status)).await;
    });

    Ok(job_id)
}

async fn load_directory(
    state: &web::Data<FulfillmentState>,
    csv_path: Option<String>,
) -> Result<BackerDirectory, BatchError> {
    let path = csv_path
        .map(PathBuf::from)
        .unwrap_or_else(|| state.config.pledge_csv_path.clone());
    let catalog = state.catalog.clone();

    tokio::task::spawn_blocking(move || -> Result<BackerDirectory, BatchError> {
        let loaded = load_export(&path, &catalog)?;
        Ok(BackerDirectory::build(loaded.rows, &catalog))
    })
    .await
    .map_err(|e| BatchError::Worker(e.to_string()))?
}
