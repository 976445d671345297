//! Integration tests for job polling.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use terra_api::mocks::{MockResponse, MockSigner, MockTransport, TestFixtures};
use terra_api::types::{Job, JobStatus};
use terra_api::{JobError, JobPoller, JobStatusSource, TerraClientBuilder, TerraError};

/// Returns a scripted status sequence, repeating the last one.
struct ScriptedJob {
    statuses: Mutex<VecDeque<u8>>,
    fetches: Mutex<usize>,
}

impl ScriptedJob {
    fn new(statuses: &[u8]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            fetches: Mutex::new(0),
        }
    }

    fn fetches(&self) -> usize {
        *self.fetches.lock()
    }
}

#[async_trait]
impl JobStatusSource for ScriptedJob {
    async fn fetch_job(&self, uuid: &str) -> Result<Job, TerraError> {
        *self.fetches.lock() += 1;
        let status = {
            let mut statuses = self.statuses.lock();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap_or_default()
            } else {
                statuses.front().copied().unwrap_or_default()
            }
        };
        Ok(serde_json::from_str(&TestFixtures::job(uuid, status)).unwrap())
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_until_finished() {
    let source = ScriptedJob::new(&[1, 2, 3, 6]);
    let poller = JobPoller::new(Duration::from_secs(10));

    let job = poller.wait(&source, "job-1").await.unwrap();

    assert_eq!(job.status, JobStatus::Finished);
    assert_eq!(source.fetches(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_interval_elapses_between_fetches() {
    let source = ScriptedJob::new(&[0, 3, 6]);
    let poller = JobPoller::new(Duration::from_secs(10));

    let started = tokio::time::Instant::now();
    poller.wait(&source, "job-1").await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_wait_reports_failure() {
    let source = ScriptedJob::new(&[1, 2, 7]);
    let poller = JobPoller::default();

    let err = poller.wait(&source, "job-1").await.unwrap_err();

    assert!(matches!(err, TerraError::Job(JobError::Failed { ref uuid, .. }) if uuid == "job-1"));
    assert_eq!(source.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_is_terminal() {
    let source = ScriptedJob::new(&[5]);
    let poller = JobPoller::default();

    let err = poller.wait(&source, "job-1").await.unwrap_err();

    assert!(matches!(err, TerraError::Job(JobError::Stopped { .. })));
    assert_eq!(source.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_guard() {
    let source = ScriptedJob::new(&[3]);
    let poller = JobPoller::new(Duration::from_secs(10)).with_max_polls(5);

    let err = poller.wait(&source, "job-1").await.unwrap_err();

    assert!(matches!(
        err,
        TerraError::Job(JobError::PollLimitReached { polls: 5, .. })
    ));
    assert_eq!(source.fetches(), 5);
}

#[tokio::test]
async fn test_wait_for_job_through_client() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::envelope(&TestFixtures::job("job-1", 2)),
        MockResponse::envelope(&TestFixtures::job("job-1", 4)),
        MockResponse::envelope(&TestFixtures::job("job-1", 6)),
    ]));
    let client = TerraClientBuilder::new()
        .config(TestFixtures::config().unwrap())
        .transport(transport.clone())
        .signer(Arc::new(MockSigner::new()))
        .build()
        .unwrap();

    let job = client.wait_for_job("job-1").await.unwrap();

    assert_eq!(job.status, JobStatus::Finished);
    assert_eq!(transport.request_count(), 3);
    assert!(transport
        .requests()
        .iter()
        .all(|r| r.url.ends_with("/terra-rescon-be/v2/jobs/job-1")));
}

#[tokio::test]
async fn test_fetch_error_ends_wait() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::failure(
        102114,
        "job does not exist",
    )]));
    let client = TerraClientBuilder::new()
        .config(TestFixtures::config().unwrap())
        .transport(transport)
        .signer(Arc::new(MockSigner::new()))
        .build()
        .unwrap();

    let err = client.wait_for_job("missing").await.unwrap_err();
    assert_eq!(err.result_code(), Some(102114));
}
