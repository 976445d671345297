//! Files service.

use crate::dispatch::{ApiCall, Dispatcher};
use crate::error::TerraError;
use crate::pagination::Page;
use crate::types::*;
use bytes::Bytes;
use std::sync::Arc;
use tracing::instrument;

/// Service for file operations.
pub struct FilesService {
    dispatcher: Arc<Dispatcher>,
}

impl FilesService {
    /// Create a new files service.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Get file metadata, including its download URL.
    #[instrument(skip(self))]
    pub async fn get(&self, uuid: &str) -> Result<FileInfo, TerraError> {
        let url = self.dispatcher.url(&["files", uuid])?;
        self.dispatcher.call(&ApiCall::get(url)).await
    }

    /// List one page of files.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &FileQuery) -> Result<Page<FileInfo>, TerraError> {
        let url = self.dispatcher.url_with_query(&["files"], &query.query_pairs())?;
        self.dispatcher.call(&ApiCall::get(url)).await
    }

    /// Fetch the contents of a file from its pre-authorised URL.
    #[instrument(skip(self, file), fields(uuid = %file.uuid))]
    pub async fn download(&self, file: &FileInfo) -> Result<Bytes, TerraError> {
        self.dispatcher.fetch_bytes(&file.url).await
    }

    /// Delete a file.
    #[instrument(skip(self))]
    pub async fn delete(&self, uuid: &str) -> Result<(), TerraError> {
        let url = self.dispatcher.url(&["files", uuid])?;
        self.dispatcher.call_unit(&ApiCall::delete(url)).await
    }
}

impl std::fmt::Debug for FilesService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesService").finish_non_exhaustive()
    }
}
