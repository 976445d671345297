//! Batched transfers between the local filesystem and object storage.
//!
//! Work is split into batches drained from the front of a queue. A batch
//! runs its members concurrently and is awaited in full before the next
//! batch starts, which bounds the number of requests in flight:
//!
//! - uploads run in batches of [`TransferConfig::upload_concurrency`]
//! - upload registration runs sequentially in rounds of
//!   [`TransferConfig::callback_batch_size`]
//! - downloads run in batches of [`TransferConfig::download_batch_size`]

mod download;
mod scan;
mod upload;

pub use download::{
    download_files, safe_destination, DownloadReport, DownloadedFile, FileSource,
};
pub use scan::{is_eligible, scan_directory, scan_eligible, ELIGIBLE_EXTENSIONS};
pub use upload::{
    register_uploads, upload_items, ObjectStore, ObjectStoreFactory, StorageTarget, TransferItem,
    UploadRegistrar, UploadReport,
};

use crate::error::TerraError;
use std::collections::VecDeque;

/// Default number of files uploaded concurrently.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 50;

/// Default number of files registered per callback.
pub const DEFAULT_CALLBACK_BATCH_SIZE: usize = 50;

/// Default number of files downloaded concurrently.
pub const DEFAULT_DOWNLOAD_BATCH_SIZE: usize = 100;

/// What a bulk operation does after a batch with failed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Finish the current batch, then start no further batches.
    #[default]
    Abort,
    /// Process every batch and report failures at the end.
    Continue,
}

/// Batch limits and failure policy.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Files uploaded concurrently per batch.
    pub upload_concurrency: usize,
    /// Files registered per upload callback.
    pub callback_batch_size: usize,
    /// Files downloaded concurrently per batch.
    pub download_batch_size: usize,
    /// Behaviour after a batch with failures.
    pub failure_policy: FailurePolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            callback_batch_size: DEFAULT_CALLBACK_BATCH_SIZE,
            download_batch_size: DEFAULT_DOWNLOAD_BATCH_SIZE,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl TransferConfig {
    /// Create a new transfer configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upload batch size.
    pub fn with_upload_concurrency(mut self, limit: usize) -> Self {
        self.upload_concurrency = limit.max(1);
        self
    }

    /// Set the callback batch size.
    pub fn with_callback_batch_size(mut self, limit: usize) -> Self {
        self.callback_batch_size = limit.max(1);
        self
    }

    /// Set the download batch size.
    pub fn with_download_batch_size(mut self, limit: usize) -> Self {
        self.download_batch_size = limit.max(1);
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// A queue consumed destructively in batches of at most `limit` items.
///
/// Every item appears in exactly one batch, in queue order.
#[derive(Debug)]
pub struct BatchQueue<T> {
    items: VecDeque<T>,
    limit: usize,
}

impl<T> BatchQueue<T> {
    /// Create a queue. A zero limit is treated as one.
    pub fn new(items: impl IntoIterator<Item = T>, limit: usize) -> Self {
        Self {
            items: items.into_iter().collect(),
            limit: limit.max(1),
        }
    }

    /// Take the next batch from the front of the queue.
    pub fn next_batch(&mut self) -> Option<Vec<T>> {
        if self.items.is_empty() {
            return None;
        }
        let take = self.limit.min(self.items.len());
        Some(self.items.drain(..take).collect())
    }

    /// Number of items not yet taken.
    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    /// Number of batches still to come.
    pub fn batches_remaining(&self) -> usize {
        batch_count(self.items.len(), self.limit)
    }

    /// Take every item not yet batched, in queue order.
    pub fn take_remaining(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }
}

impl<T> Iterator for BatchQueue<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

/// Number of batches needed for `len` items at `limit` per batch.
pub fn batch_count(len: usize, limit: usize) -> usize {
    let limit = limit.max(1);
    (len + limit - 1) / limit
}

/// Everything known about a bulk operation that did not complete.
///
/// Carried by [`TransferError::PartialFailure`](crate::error::TransferError::PartialFailure) so the caller can see what
/// failed, what already went through and where to resume.
#[derive(Debug)]
pub enum PartialReport {
    /// An upload; uploaded items carry their content tags but are not
    /// registered.
    Upload(UploadReport),
    /// A download.
    Download(DownloadReport),
}

impl PartialReport {
    /// Names of the failed items, with relative paths for uploads and uuids
    /// for downloads.
    pub fn failed_names(&self) -> Vec<&str> {
        let failed = match self {
            PartialReport::Upload(report) => &report.failed,
            PartialReport::Download(report) => &report.failed,
        };
        failed.iter().map(|f| f.name.as_str()).collect()
    }

    /// Names of the items that went through.
    pub fn completed_names(&self) -> Vec<&str> {
        match self {
            PartialReport::Upload(report) => {
                report.uploaded.iter().map(TransferItem::relative_path).collect()
            }
            PartialReport::Download(report) => {
                report.downloaded.iter().map(|f| f.uuid.as_str()).collect()
            }
        }
    }

    /// Names of the items never attempted, in queue order. Resuming starts
    /// with these.
    pub fn skipped_names(&self) -> Vec<&str> {
        match self {
            PartialReport::Upload(report) => {
                report.skipped.iter().map(TransferItem::relative_path).collect()
            }
            PartialReport::Download(report) => {
                report.skipped.iter().map(String::as_str).collect()
            }
        }
    }
}

/// An item that failed in a bulk operation.
#[derive(Debug)]
pub struct FailedTransfer {
    /// Relative path for uploads, file uuid for downloads.
    pub name: String,
    /// Why it failed.
    pub error: TerraError,
}
