//! HTTP boundary to the conversion backend.

mod client;
mod models;

pub use client::ApiClient;
pub use models::{
    FullAudioResponse, JobSnapshot, JobStatus, JobSummary, JobsResponse, MutationResponse,
};

/// Read side used by the pollers; implemented by [`ApiClient`] and by fakes
/// in tests.
pub trait JobSource {
    fn job_status(&self, job_id: &str) -> anyhow::Result<JobSnapshot>;
    fn jobs_status(&self) -> anyhow::Result<Vec<JobSummary>>;
}

impl JobSource for ApiClient {
    fn job_status(&self, job_id: &str) -> anyhow::Result<JobSnapshot> {
        ApiClient::job_status(self, job_id)
    }

    fn jobs_status(&self) -> anyhow::Result<Vec<JobSummary>> {
        ApiClient::jobs_status(self)
    }
}
