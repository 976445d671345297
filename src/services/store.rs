//! Store service for object storage credentials and upload registration.

use crate::dispatch::{ApiCall, Dispatcher};
use crate::error::TerraError;
use crate::request::Payload;
use crate::types::{FileInfo, StsToken, UploadCallbackRequest};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Service for the `store` endpoints.
pub struct StoreService {
    dispatcher: Arc<Dispatcher>,
}

impl StoreService {
    /// Create a new store service.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Obtain temporary credentials for uploading to object storage.
    ///
    /// Safe to resend, so transient failures are retried.
    #[instrument(skip(self))]
    pub async fn obtain_token(&self) -> Result<StsToken, TerraError> {
        let url = self.dispatcher.url(&["store", "obtain_token"])?;
        let call = ApiCall::post(url, Payload::Empty).idempotent();
        let token: StsToken = self.dispatcher.call(&call).await?;
        debug!(
            region = %token.region,
            bucket = %token.cloud_bucket_name,
            expire_time = token.expire_time,
            "Obtained storage token"
        );
        Ok(token)
    }

    /// Register one round of uploaded files with a resource.
    ///
    /// Sent exactly once. Batching is the caller's concern.
    #[instrument(skip(self, request), fields(resource_uuid = %request.resource_uuid, files = request.files.len()))]
    pub async fn upload_callback(
        &self,
        request: &UploadCallbackRequest,
    ) -> Result<Vec<FileInfo>, TerraError> {
        let url = self.dispatcher.url(&["store", "upload_callback"])?;
        let call = ApiCall::post(url, Payload::json(request)?);
        self.dispatcher.call(&call).await
    }
}

impl std::fmt::Debug for StoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreService").finish_non_exhaustive()
    }
}
