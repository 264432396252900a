use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    /// Percentage of backers processed so far.
    InProgress(u32),
    Completed(String),
    /// Stopped at a backer boundary; carries the number of backers processed.
    Cancelled(u32),
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed(_) | JobStatus::Cancelled(_) | JobStatus::Failed(_)
        )
    }
}
