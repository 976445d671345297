//! Jobs service for reconstruction jobs.

use crate::dispatch::{ApiCall, Dispatcher, RETURN_DETAIL};
use crate::error::TerraError;
use crate::pagination::Page;
use crate::poller::JobStatusSource;
use crate::request::Payload;
use crate::types::*;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Service for job operations.
pub struct JobsService {
    dispatcher: Arc<Dispatcher>,
}

impl JobsService {
    /// Create a new jobs service.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Create a job. The job waits for [`start`](Self::start).
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: &CreateJobRequest) -> Result<Job, TerraError> {
        let url = self.dispatcher.url(&["jobs"])?;
        let call = ApiCall::post(url, Payload::json(request)?)
            .with_header(RETURN_DETAIL.0, RETURN_DETAIL.1);
        let job: Job = self.dispatcher.call(&call).await?;
        info!(uuid = %job.uuid, "Created job");
        Ok(job)
    }

    /// Start a job on an input resource.
    #[instrument(skip(self, request), fields(resource_uuid = %request.resource_uuid, job_type = ?request.job_type))]
    pub async fn start<P: Serialize>(
        &self,
        uuid: &str,
        request: &StartJobRequest<P>,
    ) -> Result<(), TerraError> {
        let url = self.dispatcher.url(&["jobs", uuid, "start"])?;
        let call = ApiCall::post(url, Payload::Json(request.to_body()?));
        self.dispatcher.call_unit(&call).await?;
        info!("Started job");
        Ok(())
    }

    /// Get a job.
    #[instrument(skip(self))]
    pub async fn get(&self, uuid: &str) -> Result<Job, TerraError> {
        let url = self.dispatcher.url(&["jobs", uuid])?;
        self.dispatcher.call(&ApiCall::get(url)).await
    }

    /// List one page of jobs.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &JobQuery) -> Result<Page<Job>, TerraError> {
        let url = self.dispatcher.url_with_query(&["jobs"], &query.query_pairs())?;
        self.dispatcher.call(&ApiCall::get(url)).await
    }
}

#[async_trait]
impl JobStatusSource for JobsService {
    async fn fetch_job(&self, uuid: &str) -> Result<Job, TerraError> {
        self.get(uuid).await
    }
}

impl std::fmt::Debug for JobsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobsService").finish_non_exhaustive()
    }
}
