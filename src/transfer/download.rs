//! Batched downloads of resource files.

use super::{BatchQueue, FailedTransfer, FailurePolicy, PartialReport, TransferConfig};
use crate::error::{FilesystemError, TerraError, TransferError};
use crate::services::FilesService;
use crate::types::FileInfo;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Source of file metadata and file contents.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Fetch metadata, including the download URL.
    async fn file_info(&self, uuid: &str) -> Result<FileInfo, TerraError>;

    /// Fetch the contents of a file.
    async fn fetch(&self, file: &FileInfo) -> Result<Bytes, TerraError>;
}

#[async_trait]
impl FileSource for FilesService {
    async fn file_info(&self, uuid: &str) -> Result<FileInfo, TerraError> {
        self.get(uuid).await
    }

    async fn fetch(&self, file: &FileInfo) -> Result<Bytes, TerraError> {
        self.download(file).await
    }
}

/// A file written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// File uuid.
    pub uuid: String,
    /// Name from the metadata.
    pub name: String,
    /// Where it was written.
    pub path: PathBuf,
    /// Bytes written.
    pub size: u64,
}

/// Outcome of a batched download.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Files written.
    pub downloaded: Vec<DownloadedFile>,
    /// Files that failed, keyed by uuid.
    pub failed: Vec<FailedTransfer>,
    /// Size of each batch processed, in order.
    pub batches: Vec<usize>,
    /// Uuids never attempted because an earlier batch failed, in queue
    /// order.
    pub skipped: Vec<String>,
}

impl DownloadReport {
    /// Returns true if every file was written.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// The written files, or [`TransferError::PartialFailure`] carrying
    /// this report.
    pub fn into_result(self) -> Result<Vec<DownloadedFile>, TerraError> {
        if self.is_complete() {
            return Ok(self.downloaded);
        }
        let failed = self.failed.len() + self.skipped.len();
        Err(TransferError::PartialFailure {
            failed,
            total: failed + self.downloaded.len(),
            report: Box::new(PartialReport::Download(self)),
        }
        .into())
    }
}

/// Resolve a metadata name under `dest`.
///
/// Names must be relative and free of `..`; anything else could write
/// outside the destination.
pub fn safe_destination(dest: &Path, name: &str) -> Result<PathBuf, TerraError> {
    let unsafe_path = || {
        TerraError::from(TransferError::UnsafePath {
            name: name.to_string(),
        })
    };

    let relative = Path::new(name);
    if name.is_empty() || relative.is_absolute() {
        return Err(unsafe_path());
    }

    let mut path = dest.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path())
            }
        }
    }

    if path == dest {
        return Err(unsafe_path());
    }
    Ok(path)
}

/// Download files in batches of `config.download_batch_size`.
///
/// For each file, concurrently within a batch: fetch metadata, fetch the
/// bytes, create parent directories and write to `dest/<name>`. Each file
/// succeeds or fails on its own.
#[instrument(skip_all, fields(total = uuids.len(), dest = %dest.display()))]
pub async fn download_files<S>(
    source: &S,
    uuids: Vec<String>,
    dest: &Path,
    config: &TransferConfig,
) -> DownloadReport
where
    S: FileSource + ?Sized,
{
    let mut report = DownloadReport::default();
    let mut queue = BatchQueue::new(uuids, config.download_batch_size);
    let mut index = 0;

    while let Some(batch) = queue.next_batch() {
        index += 1;
        info!(batch = index, size = batch.len(), "Downloading batch");
        report.batches.push(batch.len());

        let results = join_all(batch.into_iter().map(|uuid| async move {
            let result = download_one(source, &uuid, dest).await;
            result.map_err(|error| FailedTransfer { name: uuid, error })
        }))
        .await;

        let mut batch_failed = 0;
        for result in results {
            match result {
                Ok(file) => report.downloaded.push(file),
                Err(failure) => {
                    warn!(uuid = %failure.name, error = %failure.error, "Download failed");
                    batch_failed += 1;
                    report.failed.push(failure);
                }
            }
        }

        if batch_failed > 0 && config.failure_policy == FailurePolicy::Abort {
            report.skipped = queue.take_remaining();
            warn!(
                batch = index,
                failed = batch_failed,
                skipped = report.skipped.len(),
                "Stopping download after failed batch"
            );
            break;
        }
    }

    info!(
        downloaded = report.downloaded.len(),
        failed = report.failed.len(),
        batches = report.batches.len(),
        "Download finished"
    );
    report
}

async fn download_one<S>(source: &S, uuid: &str, dest: &Path) -> Result<DownloadedFile, TerraError>
where
    S: FileSource + ?Sized,
{
    let info = source.file_info(uuid).await?;
    let path = safe_destination(dest, &info.name)?;
    let body = source.fetch(&info).await?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FilesystemError::io(parent, e))?;
    }
    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| FilesystemError::io(&path, e))?;

    debug!(uuid = uuid, path = %path.display(), size = body.len(), "Wrote file");
    Ok(DownloadedFile {
        uuid: uuid.to_string(),
        name: info.name,
        path,
        size: body.len() as u64,
    })
}
