//! Terra client implementation.
//!
//! This module provides the main client interface, its builder and the
//! multi-step workflows that span several services.

use crate::config::TerraConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ConfigurationError, TerraError};
use crate::poller::JobPoller;
use crate::services::{FilesService, JobsService, ResourcesService, StoreService};
use crate::signing::{HmacSigner, RequestSigner};
use crate::transfer::{
    download_files, register_uploads, scan_eligible, upload_items, DownloadReport,
    FailurePolicy, ObjectStoreFactory, StorageTarget, UploadReport,
};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{FileInfo, Job};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Terra client trait.
pub trait TerraClient: Send + Sync {
    /// Get the store service.
    fn store(&self) -> &StoreService;

    /// Get the resources service.
    fn resources(&self) -> &ResourcesService;

    /// Get the jobs service.
    fn jobs(&self) -> &JobsService;

    /// Get the files service.
    fn files(&self) -> &FilesService;

    /// Get the client configuration.
    fn config(&self) -> &TerraConfig;
}

/// Result of [`TerraClientImpl::upload_directory`].
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// File records returned by the upload callbacks, in submission order.
    pub registered: Vec<FileInfo>,
    /// Per-item upload results.
    pub report: UploadReport,
}

/// Terra client implementation.
pub struct TerraClientImpl {
    config: Arc<TerraConfig>,
    dispatcher: Arc<Dispatcher>,
    object_stores: Option<Arc<dyn ObjectStoreFactory>>,

    // Lazy-initialized services
    store: OnceCell<StoreService>,
    resources: OnceCell<ResourcesService>,
    jobs: OnceCell<JobsService>,
    files: OnceCell<FilesService>,
}

impl TerraClientImpl {
    /// Create a new client with the given configuration, transport and signer.
    pub fn new(
        config: TerraConfig,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn RequestSigner>,
    ) -> Self {
        let config = Arc::new(config);
        let dispatcher = Arc::new(Dispatcher::new(config.clone(), transport, signer));

        Self {
            config,
            dispatcher,
            object_stores: None,
            store: OnceCell::new(),
            resources: OnceCell::new(),
            jobs: OnceCell::new(),
            files: OnceCell::new(),
        }
    }

    /// Use this factory to reach object storage during uploads.
    pub fn with_object_store_factory(mut self, factory: Arc<dyn ObjectStoreFactory>) -> Self {
        self.object_stores = Some(factory);
        self
    }

    /// A poller using the configured interval and poll guard.
    pub fn poller(&self) -> JobPoller {
        let poller = JobPoller::new(self.config.poll_interval);
        match self.config.max_polls {
            Some(max_polls) => poller.with_max_polls(max_polls),
            None => poller,
        }
    }

    /// Upload every eligible file under `dir` and register it with a
    /// resource.
    ///
    /// Steps: scan and filter the directory, obtain a storage token, upload
    /// in batches, then register the uploaded files in callback rounds. An
    /// empty directory returns without contacting the service. Under
    /// [`FailurePolicy::Abort`] a failed upload returns
    /// [`TransferError::PartialFailure`](crate::error::TransferError::PartialFailure)
    /// and nothing is registered; the error carries the upload report, so
    /// the uploaded items with their tags and the skipped items can be
    /// registered or retried by the caller. Under [`FailurePolicy::Continue`]
    /// the files that uploaded are registered and the failures stay in the
    /// report.
    #[instrument(skip(self, dir), fields(dir = %dir.as_ref().display()))]
    pub async fn upload_directory(
        &self,
        dir: impl AsRef<Path>,
        resource_uuid: &str,
    ) -> Result<UploadOutcome, TerraError> {
        let factory = self
            .object_stores
            .as_ref()
            .ok_or(ConfigurationError::MissingObjectStore)?;

        let items = scan_eligible(dir.as_ref()).await?;
        if items.is_empty() {
            info!("No eligible files to upload");
            return Ok(UploadOutcome::default());
        }

        let token = self.store().obtain_token().await?;
        let target = StorageTarget::from_token(
            &token,
            &self.config.api_host,
            self.config.storage_endpoint.as_ref(),
        )?;
        let object_store = factory.connect(&target)?;

        let transfer = self.config.transfer_config();
        let report = upload_items(object_store.as_ref(), &token, items, &transfer).await;

        if !report.is_complete() && transfer.failure_policy == FailurePolicy::Abort {
            return report.into_result().map(|_| UploadOutcome::default());
        }
        if !report.is_complete() {
            warn!(
                failed = report.failed.len(),
                uploaded = report.uploaded.len(),
                "Registering partial upload"
            );
        }

        let registered = register_uploads(
            self.store(),
            &token.callback_param,
            resource_uuid,
            &report.uploaded,
            transfer.callback_batch_size,
        )
        .await?;

        info!(registered = registered.len(), "Upload registered");
        Ok(UploadOutcome { registered, report })
    }

    /// Download every file of a resource into `dest`.
    ///
    /// Under [`FailurePolicy::Abort`] an incomplete download is an error
    /// carrying the download report; under [`FailurePolicy::Continue`] the
    /// returned report carries the failures.
    #[instrument(skip(self, dest), fields(dest = %dest.as_ref().display()))]
    pub async fn download_resource(
        &self,
        resource_uuid: &str,
        dest: impl AsRef<Path>,
    ) -> Result<DownloadReport, TerraError> {
        let detail = self.resources().get(resource_uuid).await?;
        let transfer = self.config.transfer_config();
        let report = download_files(self.files(), detail.file_uuids, dest.as_ref(), &transfer).await;

        if !report.is_complete() && transfer.failure_policy == FailurePolicy::Abort {
            return report.into_result().map(|_| DownloadReport::default());
        }
        Ok(report)
    }

    /// Poll a job until it finishes, fails or is stopped.
    pub async fn wait_for_job(&self, uuid: &str) -> Result<Job, TerraError> {
        self.poller().wait(self.jobs(), uuid).await
    }
}

impl TerraClient for TerraClientImpl {
    fn store(&self) -> &StoreService {
        self.store
            .get_or_init(|| StoreService::new(self.dispatcher.clone()))
    }

    fn resources(&self) -> &ResourcesService {
        self.resources
            .get_or_init(|| ResourcesService::new(self.dispatcher.clone()))
    }

    fn jobs(&self) -> &JobsService {
        self.jobs
            .get_or_init(|| JobsService::new(self.dispatcher.clone()))
    }

    fn files(&self) -> &FilesService {
        self.files
            .get_or_init(|| FilesService::new(self.dispatcher.clone()))
    }

    fn config(&self) -> &TerraConfig {
        &self.config
    }
}

impl std::fmt::Debug for TerraClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerraClientImpl")
            .field("config", &self.config)
            .field("object_stores", &self.object_stores.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for the Terra client.
pub struct TerraClientBuilder {
    config: Option<TerraConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    signer: Option<Arc<dyn RequestSigner>>,
    object_stores: Option<Arc<dyn ObjectStoreFactory>>,
}

impl TerraClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            transport: None,
            signer: None,
            object_stores: None,
        }
    }

    /// Use the provided configuration.
    pub fn config(mut self, config: TerraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom request signer.
    pub fn signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Use this factory to reach object storage during uploads.
    pub fn object_store_factory(mut self, factory: Arc<dyn ObjectStoreFactory>) -> Self {
        self.object_stores = Some(factory);
        self
    }

    /// Build the client.
    ///
    /// Without an explicit configuration, one is loaded from the
    /// environment.
    pub fn build(self) -> Result<TerraClientImpl, TerraError> {
        let config = match self.config {
            Some(config) => config,
            None => TerraConfig::builder().from_env().build()?,
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };

        let signer = match self.signer {
            Some(signer) => signer,
            None => Arc::new(HmacSigner::new(config.credential.clone())),
        };

        let client = TerraClientImpl::new(config, transport, signer);
        Ok(match self.object_stores {
            Some(factory) => client.with_object_store_factory(factory),
            None => client,
        })
    }
}

impl Default for TerraClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
