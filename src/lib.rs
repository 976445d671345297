//! Terra API Client
//!
//! Type-safe client for the Terra cloud reconstruction API.
//!
//! # Features
//!
//! - **HMAC Signing**: Every call carries a fresh `Date`, `Digest` and
//!   `Authorization` header computed over the exact bytes sent
//! - **Batched Transfers**: Directory uploads and resource downloads with
//!   bounded concurrency and per-item failure reporting
//! - **Job Tracking**: Fixed-interval polling until a job is terminal
//! - **Resilience**: Retry with exponential backoff for idempotent calls
//! - **Observability**: Structured logging through `tracing`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use terra_api::{TerraClient, JobStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), terra_api::TerraError> {
//!     // Reads DJI_APP_KEY and DJI_SECRET_KEY
//!     let client = terra_api::create_client_from_env()?;
//!
//!     let resource = client
//!         .resources()
//!         .create(&terra_api::CreateResourceRequest::new("survey"))
//!         .await?;
//!     println!("Created resource {}", resource.uuid);
//!
//!     let job = client.wait_for_job("job-uuid").await?;
//!     assert_eq!(job.status, JobStatus::Finished);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod mocks;
pub mod pagination;
pub mod poller;
pub mod request;
pub mod resilience;
pub mod services;
pub mod signing;
pub mod transfer;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use client::{TerraClient, TerraClientBuilder, TerraClientImpl, UploadOutcome};
pub use config::{TerraConfig, TerraConfigBuilder};
pub use credentials::Credential;
pub use dispatch::{ApiCall, ApiOutcome, Dispatcher};
pub use error::{
    ConfigurationError, FilesystemError, JobError, NetworkError, RemoteError, RemoteErrorKind,
    ResponseError, ServerError, SigningError, TerraError, TransferError,
};
pub use pagination::{collect_pages, Page, PaginationCursor};
pub use poller::{JobPoller, JobStatusSource};
pub use services::{FilesService, JobsService, ResourcesService, StoreService};
pub use signing::{HmacSigner, RequestSigner, SignatureHeaders};
pub use transfer::{
    DownloadReport, FailurePolicy, ObjectStore, ObjectStoreFactory, PartialReport, StorageTarget,
    TransferConfig, TransferItem, UploadReport,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport};
pub use types::{
    // Request types
    CreateJobRequest,
    CreateResourceRequest,
    FileQuery,
    JobParameters,
    JobQuery,
    ListQuery,
    ResourceQuery,
    StartJobRequest,
    UploadCallbackRequest,
    UploadedFile,
    // Response types
    FileInfo,
    Job,
    Resource,
    ResourceDetail,
    StsToken,
    // Common types
    DeleteMode,
    JobStatus,
    JobType,
    Position,
    ResourceType,
    Scope,
};

/// Create a new Terra client from environment variables.
///
/// This will read configuration from:
/// - `DJI_APP_KEY` and `DJI_SECRET_KEY` for the credential
/// - `TERRA_API_HOST` for the API host
/// - `TERRA_MAX_RETRIES`, `TERRA_POLL_INTERVAL_SECS` and the transfer limit
///   variables for tuning
///
/// # Example
///
/// ```rust,no_run
/// let client = terra_api::create_client_from_env()?;
/// # Ok::<(), terra_api::TerraError>(())
/// ```
pub fn create_client_from_env() -> Result<TerraClientImpl> {
    TerraClientBuilder::new().build()
}

/// Create a new Terra client with explicit configuration.
///
/// # Example
///
/// ```rust,no_run
/// use terra_api::{Credential, TerraConfig};
///
/// let config = TerraConfig::builder()
///     .credential(Credential::new("app-key", "secret-key")?)
///     .api_host("https://openapi-us.dji.com")
///     .build()?;
///
/// let client = terra_api::create_client(config)?;
/// # Ok::<(), terra_api::TerraError>(())
/// ```
pub fn create_client(config: TerraConfig) -> Result<TerraClientImpl> {
    TerraClientBuilder::new().config(config).build()
}

/// Result type alias for Terra operations.
pub type Result<T> = std::result::Result<T, TerraError>;
