//! Tracks the status of background fulfillment batches.
//!
//! - `JobsState`: clonable, thread-safe map of job id to `JobStatus`, injected
//!   into the Actix application in `main.rs`.
//! - `JobUpdate`: a status change sent by a running batch.
//! - `start_job_updater`: the single task that applies `JobUpdate`s to the map.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

#[derive(Clone)]
pub struct JobsState {
    /// Read by `GET /api/fulfillment/status/{job_id}`, written by the updater.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Batches push their progress here instead of locking `jobs` themselves.
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobsState {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(capacity);
        let state = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    /// Registers a new job as `Pending`.
    pub async fn register(&self, job_id: &str) {
        self.jobs
            .write()
            .await
            .insert(job_id.to_string(), JobStatus::Pending);
    }

    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
        }
    }
}

/// Applies job updates for the lifetime of the server. Spawned once from `main.rs`.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id.clone(), update.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_updater_applies_updates_in_order() {
        let (state, rx) = JobsState::new(8);
        state.register("job-1").await;
        assert_eq!(state.status("job-1").await, Some(JobStatus::Pending));

        let updater = tokio::spawn(start_job_updater(state.clone(), rx));
        state.tx.send(JobUpdate::new("job-1", JobStatus::InProgress(50))).await.unwrap();
        state.tx.send(JobUpdate::new("job-1", JobStatus::Cancelled(3))).await.unwrap();

        for _ in 0..100 {
            if state.status("job-1").await == Some(JobStatus::Cancelled(3)) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(state.status("job-1").await, Some(JobStatus::Cancelled(3)));
        updater.abort();
    }
}
