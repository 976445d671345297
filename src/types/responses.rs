//! Response types decoded from the `data` field of the envelope.

use super::common::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Temporary object-storage credentials returned by `obtain_token`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StsToken {
    /// Temporary access key id.
    #[serde(rename = "accessKeyID")]
    pub access_key_id: String,
    /// Temporary secret access key.
    pub secret_access_key: SecretString,
    /// Session token.
    pub session_token: SecretString,
    /// Storage region.
    pub region: String,
    /// Bucket receiving uploads.
    pub cloud_bucket_name: String,
    /// Storage provider, e.g. `AWS_S3` or `ALI_OSS`.
    #[serde(default)]
    pub cloud_name: String,
    /// Expiration, unix seconds.
    #[serde(default)]
    pub expire_time: i64,
    /// Opaque value echoed back by the upload callback.
    pub callback_param: String,
    /// Key template; `{fileName}` is replaced by the relative path.
    pub store_path: String,
}

impl StsToken {
    /// Placeholder substituted in [`StsToken::store_path`].
    pub const FILE_NAME_PLACEHOLDER: &'static str = "{fileName}";

    /// Storage key for a relative file path.
    pub fn storage_key(&self, relative_path: &str) -> String {
        self.store_path
            .replace(Self::FILE_NAME_PLACEHOLDER, relative_path)
    }

    /// Get the secret access key.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Get the session token.
    pub fn session_token(&self) -> &str {
        self.session_token.expose_secret()
    }
}

impl std::fmt::Debug for StsToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsToken")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("region", &self.region)
            .field("cloud_bucket_name", &self.cloud_bucket_name)
            .field("cloud_name", &self.cloud_name)
            .field("expire_time", &self.expire_time)
            .field("store_path", &self.store_path)
            .finish_non_exhaustive()
    }
}

/// Resource summary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource uuid.
    pub uuid: String,
    /// Resource name.
    pub name: String,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// User extension information.
    #[serde(default)]
    pub meta: String,
    /// Number of included files.
    #[serde(default)]
    pub file_count: u64,
    /// Total size of included files in bytes.
    #[serde(default)]
    pub total_size: u64,
    /// Geographic extent.
    #[serde(default)]
    pub scope: Scope,
    /// Whether the resource can be modified.
    #[serde(default)]
    pub revisable: bool,
    /// Upload time in seconds.
    #[serde(default)]
    pub upload_used_time: f64,
    /// Download time in seconds.
    #[serde(default)]
    pub download_used_time: f64,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created_at: String,
    /// RFC 3339 update time.
    #[serde(default)]
    pub updated_at: String,
}

/// Resource with its linked files and jobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDetail {
    /// Resource summary.
    pub summary: Resource,
    /// Uuids of files in the resource.
    #[serde(default)]
    pub file_uuids: Vec<String>,
    /// Jobs consuming this resource.
    #[serde(default)]
    pub input_job_uuids: Vec<String>,
    /// Jobs producing this resource.
    #[serde(default)]
    pub output_job_uuids: Vec<String>,
}

/// File metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// File uuid.
    pub uuid: String,
    /// File name, relative path within its resource.
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Checksum registered at upload.
    #[serde(default)]
    pub checksum: String,
    /// Pre-authorised download URL.
    #[serde(default)]
    pub url: String,
    /// User extension information.
    #[serde(default)]
    pub meta: String,
    /// Camera position.
    #[serde(default)]
    pub position: Position,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created_at: String,
    /// RFC 3339 update time.
    #[serde(default)]
    pub updated_at: String,
}

/// Job details.
///
/// Most fields are absent until the job has been started.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job uuid.
    pub uuid: String,
    /// Job name.
    pub name: String,
    /// Current status.
    pub status: JobStatus,
    /// Job type.
    #[serde(rename = "type", default)]
    pub job_type: Option<JobType>,
    /// User extension information.
    #[serde(default)]
    pub meta: String,
    /// Status message.
    #[serde(default)]
    pub message: Option<String>,
    /// Input resource.
    #[serde(default)]
    pub origin_resource_uuid: Option<String>,
    /// Output resource.
    #[serde(default)]
    pub output_resource_uuid: Option<String>,
    /// Parameters the job was started with, as a JSON string.
    #[serde(default)]
    pub parameters: Option<String>,
    /// Progress from 0 to 1.
    #[serde(default)]
    pub percentage: Option<f64>,
    /// Total pixels.
    #[serde(default)]
    pub pixels: Option<f64>,
    /// Remaining time in seconds.
    #[serde(default)]
    pub remain_seconds: Option<i64>,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created_at: String,
    /// RFC 3339 update time.
    #[serde(default)]
    pub updated_at: String,
    /// RFC 3339 start time.
    #[serde(default)]
    pub started_at: Option<String>,
    /// RFC 3339 completion time.
    #[serde(default)]
    pub completed_at: Option<String>,
}
