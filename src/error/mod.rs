//! Error types for the Terra API client.
//!
//! Errors are grouped by where they originate: construction, the remote
//! application, the network, the response decoder, bulk transfers, the local
//! filesystem and job tracking. Every public operation returns a single
//! [`TerraError`] carrying one of these categories.

mod mapping;

pub use mapping::{map_result_code, RemoteErrorKind};

use crate::transfer::PartialReport;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the Terra API client.
#[derive(Debug, Error)]
pub enum TerraError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Request signing errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Non-zero result code returned by the service.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// HTTP-level server errors.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Response decoding errors.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// Bulk transfer errors.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Local filesystem errors.
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Job tracking errors.
    #[error("Job error: {0}")]
    Job(#[from] JobError),
}

impl TerraError {
    /// Returns true if the error is retryable at the transport level.
    pub fn is_retryable(&self) -> bool {
        match self {
            TerraError::Network(e) => e.is_retryable(),
            TerraError::Server(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the remote result code if the service rejected the call.
    pub fn result_code(&self) -> Option<i64> {
        match self {
            TerraError::Remote(e) => Some(e.code),
            _ => None,
        }
    }

    /// Returns the HTTP status code if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TerraError::Server(e) => Some(e.status()),
            _ => None,
        }
    }

    /// Returns the per-item results of an incomplete bulk operation.
    pub fn partial_report(&self) -> Option<&PartialReport> {
        match self {
            TerraError::Transfer(TransferError::PartialFailure { report, .. }) => Some(&**report),
            _ => None,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Missing application key or secret key.
    #[error("Missing credentials: DJI_APP_KEY or DJI_SECRET_KEY is not set")]
    MissingCredentials,

    /// Invalid API host URL.
    #[error("Invalid API host: {url} ({details})")]
    InvalidHost {
        /// The invalid URL.
        url: String,
        /// Details about the parse error.
        details: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {message}")]
    HttpClient {
        /// Error message.
        message: String,
    },

    /// No object store was provided for uploads.
    #[error("No object store configured for uploads")]
    MissingObjectStore,
}

/// Request signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The request URL could not be parsed.
    #[error("Invalid request URL '{url}': {details}")]
    InvalidUrl {
        /// The invalid URL.
        url: String,
        /// Parse error details.
        details: String,
    },

    /// The payload could not be serialized.
    #[error("Payload serialization failed: {message}")]
    PayloadSerialization {
        /// Error message.
        message: String,
    },
}

/// A non-zero result code returned in the response envelope.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct RemoteError {
    /// Result code from the envelope.
    pub code: i64,
    /// Result message from the envelope, verbatim.
    pub message: String,
    /// Mapped category of the code.
    pub kind: RemoteErrorKind,
}

impl RemoteError {
    /// Build a remote error from an envelope result code and message.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            kind: map_result_code(code),
        }
    }
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout duration.
        duration: Duration,
    },

    /// Connection reset.
    #[error("Connection reset by peer")]
    ConnectionReset,

    /// The request could not be constructed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },
}

impl NetworkError {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. }
                | NetworkError::Timeout { .. }
                | NetworkError::ConnectionReset
        )
    }
}

/// HTTP-level errors returned without a decodable envelope.
#[derive(Debug, Error)]
pub enum ServerError {
    /// 5xx response.
    #[error("Server returned {status}: {message}")]
    Internal {
        /// HTTP status.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// 429 response.
    #[error("Too many requests")]
    TooManyRequests {
        /// Retry after duration hint.
        retry_after: Option<Duration>,
    },

    /// Any other non-success status.
    #[error("Unexpected HTTP status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status.
        status: u16,
        /// Response body excerpt.
        message: String,
    },
}

impl ServerError {
    /// Returns the HTTP status code.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::Internal { status, .. } => *status,
            ServerError::TooManyRequests { .. } => 429,
            ServerError::UnexpectedStatus { status, .. } => *status,
        }
    }

    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServerError::Internal { .. } | ServerError::TooManyRequests { .. }
        )
    }
}

/// Response decoding errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// JSON decode error.
    #[error("JSON decode error: {message}")]
    Decode {
        /// Error message.
        message: String,
    },

    /// Envelope reported success but carried no data.
    #[error("Missing data in response for {endpoint}")]
    MissingData {
        /// The endpoint that was called.
        endpoint: String,
    },
}

/// Bulk transfer errors.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Object storage rejected an upload.
    #[error("Upload of '{key}' failed: {message}")]
    UploadFailed {
        /// Storage key.
        key: String,
        /// Error message.
        message: String,
    },

    /// Object storage accepted an upload but returned no content tag.
    #[error("Upload of '{key}' returned an empty content tag")]
    EmptyContentTag {
        /// Storage key.
        key: String,
    },

    /// An item reached registration without a content tag.
    #[error("File '{name}' has no content tag")]
    MissingContentTag {
        /// Relative file name.
        name: String,
    },

    /// A content tag was assigned twice.
    #[error("File '{name}' already has content tag '{existing}'")]
    TagAlreadyAssigned {
        /// Relative file name.
        name: String,
        /// The tag that stays assigned.
        existing: String,
    },

    /// A download name would escape the destination directory.
    #[error("Refusing to write outside destination: '{name}'")]
    UnsafePath {
        /// Name from file metadata.
        name: String,
    },

    /// One or more items in a bulk operation failed or were skipped.
    #[error("{failed} of {total} items failed")]
    PartialFailure {
        /// Failed plus skipped items.
        failed: usize,
        /// All items of the operation.
        total: usize,
        /// Per-item results.
        report: Box<PartialReport>,
    },
}

/// Local filesystem errors.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// Path does not exist or is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// I/O failure on a path.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A file name that is not valid UTF-8 cannot be used as a storage key.
    #[error("File name is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// Directory traversal failure.
    #[error("Directory walk failed: {message}")]
    Walk {
        /// Error message.
        message: String,
    },
}

impl FilesystemError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FilesystemError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Job tracking errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job ended in the failed state.
    #[error("Job {uuid} failed: {message}")]
    Failed {
        /// Job uuid.
        uuid: String,
        /// Status message reported by the service.
        message: String,
    },

    /// The job was stopped before finishing.
    #[error("Job {uuid} was stopped")]
    Stopped {
        /// Job uuid.
        uuid: String,
    },

    /// The poll guard was exhausted before a terminal status.
    #[error("Job {uuid} not terminal after {polls} polls")]
    PollLimitReached {
        /// Job uuid.
        uuid: String,
        /// Number of status fetches performed.
        polls: u32,
    },

    /// The service returned an unknown status ordinal.
    #[error("Unknown job status {0}")]
    UnknownStatus(u8),
}
