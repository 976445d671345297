//! Batched uploads to object storage and upload registration.

use super::{BatchQueue, FailedTransfer, FailurePolicy, PartialReport, TransferConfig};
use crate::error::{FilesystemError, TerraError, TransferError};
use crate::services::StoreService;
use crate::types::{FileInfo, StsToken, UploadCallbackRequest, UploadedFile};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use once_cell::sync::OnceCell;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Object storage capability: store bytes under a key, return the content
/// tag (entity tag) assigned by the store.
///
/// The body is the whole file in memory. A batch holds up to
/// [`TransferConfig::upload_concurrency`] bodies at once, so lower that
/// limit for large files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store one object. The returned tag must be non-empty.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<String, TerraError>;
}

/// Creates an [`ObjectStore`] for the temporary credentials of one upload.
pub trait ObjectStoreFactory: Send + Sync {
    /// Connect to the storage target.
    fn connect(&self, target: &StorageTarget) -> Result<Arc<dyn ObjectStore>, TerraError>;
}

/// Where and as whom to upload, derived from an [`StsToken`].
#[derive(Clone)]
pub struct StorageTarget {
    /// Storage provider name from the token.
    pub cloud_name: String,
    /// Region.
    pub region: String,
    /// Bucket.
    pub bucket: String,
    /// Temporary access key id.
    pub access_key_id: String,
    secret_access_key: SecretString,
    session_token: SecretString,
    /// Endpoint; `None` means the provider default for the region.
    pub endpoint: Option<Url>,
}

impl StorageTarget {
    /// Derive the target from a token.
    ///
    /// An explicit endpoint wins. Otherwise a region-suffixed API host
    /// (containing `-cn`) selects `https://{region}.aliyuncs.com`.
    pub fn from_token(
        token: &StsToken,
        api_host: &Url,
        endpoint_override: Option<&Url>,
    ) -> Result<Self, TerraError> {
        let endpoint = match endpoint_override {
            Some(endpoint) => Some(endpoint.clone()),
            None if api_host.host_str().map_or(false, |h| h.contains("-cn")) => {
                let raw = format!("https://{}.aliyuncs.com", token.region);
                Some(Url::parse(&raw).map_err(|e| {
                    crate::error::ConfigurationError::InvalidHost {
                        url: raw.clone(),
                        details: e.to_string(),
                    }
                })?)
            }
            None => None,
        };

        Ok(Self {
            cloud_name: token.cloud_name.clone(),
            region: token.region.clone(),
            bucket: token.cloud_bucket_name.clone(),
            access_key_id: token.access_key_id.clone(),
            secret_access_key: token.secret_access_key.clone(),
            session_token: token.session_token.clone(),
            endpoint,
        })
    }

    /// Get the temporary secret access key.
    ///
    /// Note: This exposes the secret. Avoid logging.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Get the session token.
    pub fn session_token(&self) -> &str {
        self.session_token.expose_secret()
    }
}

impl std::fmt::Debug for StorageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageTarget")
            .field("cloud_name", &self.cloud_name)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .finish()
    }
}

/// A local file taking part in an upload.
///
/// The size is read on first request. The content tag can be assigned once.
#[derive(Debug, Clone)]
pub struct TransferItem {
    relative_path: String,
    absolute_path: PathBuf,
    size: OnceCell<u64>,
    content_tag: OnceCell<String>,
}

impl TransferItem {
    /// Create an item for `relative_path` under `root`.
    pub fn new(root: &Path, relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let absolute_path = relative_path
            .split('/')
            .fold(root.to_path_buf(), |path, part| path.join(part));
        Self {
            relative_path,
            absolute_path,
            size: OnceCell::new(),
            content_tag: OnceCell::new(),
        }
    }

    /// Relative path with `/` separators; also the registered file name.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Path on disk.
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Size in bytes, read from the filesystem on first use.
    pub fn size(&self) -> Result<u64, TerraError> {
        self.size
            .get_or_try_init(|| {
                std::fs::metadata(&self.absolute_path)
                    .map(|m| m.len())
                    .map_err(|e| FilesystemError::io(&self.absolute_path, e))
            })
            .copied()
            .map_err(TerraError::from)
    }

    /// Content tag, once uploaded.
    pub fn content_tag(&self) -> Option<&str> {
        self.content_tag.get().map(String::as_str)
    }

    /// Assign the content tag. A second assignment fails and leaves the
    /// first tag in place.
    pub fn assign_tag(&self, tag: impl Into<String>) -> Result<(), TerraError> {
        self.content_tag.set(tag.into()).map_err(|_| {
            TransferError::TagAlreadyAssigned {
                name: self.relative_path.clone(),
                existing: self.content_tag().unwrap_or_default().to_string(),
            }
            .into()
        })
    }

    /// Registration record; requires a non-empty content tag.
    pub fn to_uploaded_file(&self) -> Result<UploadedFile, TerraError> {
        let tag = self
            .content_tag()
            .filter(|tag| !tag.is_empty())
            .ok_or_else(|| TransferError::MissingContentTag {
                name: self.relative_path.clone(),
            })?;
        Ok(UploadedFile {
            name: self.relative_path.clone(),
            etag: tag.to_string(),
            checksum: tag.to_string(),
        })
    }
}

/// Outcome of a batched upload.
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Items stored, each with a content tag.
    pub uploaded: Vec<TransferItem>,
    /// Items that failed.
    pub failed: Vec<FailedTransfer>,
    /// Size of each batch processed, in order.
    pub batches: Vec<usize>,
    /// Items never attempted because an earlier batch failed, in queue
    /// order.
    pub skipped: Vec<TransferItem>,
}

impl UploadReport {
    /// Returns true if every item was uploaded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Number of items attempted or skipped.
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failed.len() + self.skipped.len()
    }

    /// The uploaded items, or [`TransferError::PartialFailure`] carrying
    /// this report.
    pub fn into_result(self) -> Result<Vec<TransferItem>, TerraError> {
        if self.is_complete() {
            return Ok(self.uploaded);
        }
        Err(TransferError::PartialFailure {
            failed: self.failed.len() + self.skipped.len(),
            total: self.total(),
            report: Box::new(PartialReport::Upload(self)),
        }
        .into())
    }
}

/// Upload items in batches of `config.upload_concurrency`.
///
/// Items in a batch are uploaded concurrently and the whole batch is
/// awaited before the next one starts. Each item's key is the token's store
/// path with the relative path substituted. Item failures are collected in
/// the report; under [`FailurePolicy::Abort`] no batch starts after one
/// that had failures.
#[instrument(skip_all, fields(total = items.len(), bucket = %token.cloud_bucket_name))]
pub async fn upload_items(
    store: &dyn ObjectStore,
    token: &StsToken,
    items: Vec<TransferItem>,
    config: &TransferConfig,
) -> UploadReport {
    let mut report = UploadReport::default();
    let mut queue = BatchQueue::new(items, config.upload_concurrency);
    let mut index = 0;

    while let Some(batch) = queue.next_batch() {
        index += 1;
        info!(batch = index, size = batch.len(), "Uploading batch");
        report.batches.push(batch.len());

        let results = join_all(batch.into_iter().map(|item| upload_one(store, token, item))).await;

        let mut batch_failed = 0;
        for result in results {
            match result {
                Ok(item) => report.uploaded.push(item),
                Err(failure) => {
                    warn!(name = %failure.name, error = %failure.error, "Upload failed");
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
                "Stopping upload after failed batch"
            );
            break;
        }
    }

    info!(
        uploaded = report.uploaded.len(),
        failed = report.failed.len(),
        batches = report.batches.len(),
        "Upload finished"
    );
    report
}

async fn upload_one(
    store: &dyn ObjectStore,
    token: &StsToken,
    item: TransferItem,
) -> Result<TransferItem, FailedTransfer> {
    let fail = |error: TerraError| FailedTransfer {
        name: item.relative_path().to_string(),
        error,
    };

    let body = match tokio::fs::read(item.absolute_path()).await {
        Ok(body) => body,
        Err(e) => return Err(fail(FilesystemError::io(item.absolute_path(), e).into())),
    };
    let _ = item.size.set(body.len() as u64);

    let key = token.storage_key(item.relative_path());
    let tag = match store
        .put_object(&token.cloud_bucket_name, &key, Bytes::from(body))
        .await
    {
        Ok(tag) => tag,
        Err(e) => {
            return Err(fail(
                TransferError::UploadFailed {
                    key,
                    message: e.to_string(),
                }
                .into(),
            ))
        }
    };

    if tag.is_empty() {
        return Err(fail(TransferError::EmptyContentTag { key }.into()));
    }
    if let Err(e) = item.assign_tag(tag) {
        return Err(fail(e));
    }
    debug!(key = %key, "Uploaded object");
    Ok(item)
}

/// Registers uploaded files with a resource.
#[async_trait]
pub trait UploadRegistrar: Send + Sync {
    /// Register one round of files.
    async fn register(&self, request: &UploadCallbackRequest) -> Result<Vec<FileInfo>, TerraError>;
}

#[async_trait]
impl UploadRegistrar for StoreService {
    async fn register(&self, request: &UploadCallbackRequest) -> Result<Vec<FileInfo>, TerraError> {
        self.upload_callback(request).await
    }
}

/// Register uploaded items in sequential rounds of `batch_size`.
///
/// Every item must carry a content tag; this is checked before any round is
/// sent. Results are concatenated in submission order.
#[instrument(skip_all, fields(total = items.len(), resource_uuid = %resource_uuid))]
pub async fn register_uploads<R>(
    registrar: &R,
    callback_param: &str,
    resource_uuid: &str,
    items: &[TransferItem],
    batch_size: usize,
) -> Result<Vec<FileInfo>, TerraError>
where
    R: UploadRegistrar + ?Sized,
{
    let files = items
        .iter()
        .map(TransferItem::to_uploaded_file)
        .collect::<Result<Vec<_>, _>>()?;

    let mut registered = Vec::with_capacity(files.len());
    for (index, round) in BatchQueue::new(files, batch_size).enumerate() {
        info!(round = index + 1, size = round.len(), "Registering uploaded files");
        let request = UploadCallbackRequest {
            callback_param: callback_param.to_string(),
            files: round,
            resource_uuid: resource_uuid.to_string(),
        };
        let records = registrar.register(&request).await?;
        registered.extend(records);
    }

    Ok(registered)
}
