//! Resources service.

use crate::dispatch::{ApiCall, Dispatcher, RETURN_DETAIL};
use crate::error::TerraError;
use crate::pagination::Page;
use crate::request::Payload;
use crate::types::*;
use std::sync::Arc;
use tracing::instrument;

/// Service for resource operations.
pub struct ResourcesService {
    dispatcher: Arc<Dispatcher>,
}

impl ResourcesService {
    /// Create a new resources service.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Create a resource.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: &CreateResourceRequest) -> Result<Resource, TerraError> {
        let url = self.dispatcher.url(&["resources"])?;
        let call = ApiCall::post(url, Payload::json(request)?)
            .with_header(RETURN_DETAIL.0, RETURN_DETAIL.1);
        self.dispatcher.call(&call).await
    }

    /// Get a resource with its file and job uuids.
    #[instrument(skip(self))]
    pub async fn get(&self, uuid: &str) -> Result<ResourceDetail, TerraError> {
        let url = self.dispatcher.url(&["resources", uuid])?;
        self.dispatcher.call(&ApiCall::get(url)).await
    }

    /// List one page of resources.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ResourceQuery) -> Result<Page<Resource>, TerraError> {
        let url = self
            .dispatcher
            .url_with_query(&["resources"], &query.query_pairs())?;
        self.dispatcher.call(&ApiCall::get(url)).await
    }

    /// Delete a resource.
    #[instrument(skip(self))]
    pub async fn delete(&self, uuid: &str, mode: DeleteMode) -> Result<(), TerraError> {
        let mode = mode.as_u8().to_string();
        let url = self
            .dispatcher
            .url_with_query(&["resources", uuid], &[("deleteMode", mode)])?;
        self.dispatcher.call_unit(&ApiCall::delete(url)).await
    }
}

impl std::fmt::Debug for ResourcesService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcesService").finish_non_exhaustive()
    }
}
