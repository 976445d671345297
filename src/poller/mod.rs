//! Job status polling.
//!
//! A job moves through status ordinals 0 to 7 under the control of the
//! service. [`JobPoller`] re-fetches the job on a fixed interval until the
//! status is stopped, finished or failed. Only finished is a success.

use crate::error::{JobError, TerraError};
use crate::types::{Job, JobStatus};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default interval between status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Something that can report the current state of a job.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// Fetch the job.
    async fn fetch_job(&self, uuid: &str) -> Result<Job, TerraError>;
}

/// Polls a job until it reaches a terminal status.
#[derive(Debug, Clone)]
pub struct JobPoller {
    interval: Duration,
    max_polls: Option<u32>,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
        }
    }
}

impl JobPoller {
    /// Create a poller with the given interval and no poll limit.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_polls: None,
        }
    }

    /// Give up after this many fetches.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    /// Get the poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until the job is terminal.
    ///
    /// Returns the job when it finished, [`JobError::Failed`] or
    /// [`JobError::Stopped`] otherwise. The first fetch happens immediately;
    /// the interval elapses between fetches. Fetch errors end the wait.
    #[instrument(skip(self, source), fields(interval_ms = self.interval.as_millis() as u64))]
    pub async fn wait<S>(&self, source: &S, uuid: &str) -> Result<Job, TerraError>
    where
        S: JobStatusSource + ?Sized,
    {
        let mut polls: u32 = 0;

        loop {
            let job = source.fetch_job(uuid).await?;
            polls += 1;

            debug!(
                polls = polls,
                status = %job.status,
                percentage = ?job.percentage,
                "Polled job status"
            );

            match job.status {
                JobStatus::Finished => {
                    info!(polls = polls, "Job finished");
                    return Ok(job);
                }
                JobStatus::Failed => {
                    warn!(polls = polls, message = ?job.message, "Job failed");
                    return Err(JobError::Failed {
                        uuid: uuid.to_string(),
                        message: job.message.unwrap_or_default(),
                    }
                    .into());
                }
                JobStatus::Stopped => {
                    warn!(polls = polls, "Job stopped");
                    return Err(JobError::Stopped {
                        uuid: uuid.to_string(),
                    }
                    .into());
                }
                _ => {}
            }

            if let Some(max_polls) = self.max_polls {
                if polls >= max_polls {
                    return Err(JobError::PollLimitReached {
                        uuid: uuid.to_string(),
                        polls,
                    }
                    .into());
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
