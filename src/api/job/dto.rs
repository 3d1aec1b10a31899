use serde::Serialize;

use super::models::JobEntry;

/// Response for job listings
#[derive(Serialize)]
pub struct JobListResponse {
    pub count: usize,
    pub jobs: Vec<JobEntry>,
}

impl From<Vec<JobEntry>> for JobListResponse {
    fn from(jobs: Vec<JobEntry>) -> Self {
        Self {
            count: jobs.len(),
            jobs,
        }
    }
}

/// Response for a confirmed state-changing transaction
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub message: String,
    pub signature: String,
}
