//! Configuration types for the Terra API client.
//!
//! This module provides [`TerraConfig`], which carries the credential, the
//! API host, transport timeouts, retry settings, the job poll interval and
//! the transfer batch limits.

use crate::credentials::{Credential, DJI_APP_KEY, DJI_SECRET_KEY};
use crate::error::{ConfigurationError, TerraError};
use crate::resilience::RetryConfig;
use crate::transfer::{FailurePolicy, TransferConfig};
use std::time::Duration;
use url::Url;

/// Default API host.
pub const DEFAULT_API_HOST: &str = "https://openapi-cn.dji.com";

/// Base path of the v2 API.
pub const DEFAULT_BASE_PATH: &str = "/terra-rescon-be/v2";

/// Environment variable overriding the API host.
pub const TERRA_API_HOST: &str = "TERRA_API_HOST";

/// Configuration for the Terra client.
#[derive(Clone)]
pub struct TerraConfig {
    /// Application credential.
    pub credential: Credential,

    /// API host, e.g. `https://openapi-cn.dji.com`.
    pub api_host: Url,

    /// Base path prepended to every endpoint.
    pub base_path: String,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Read timeout for individual requests.
    pub read_timeout: Duration,

    /// Maximum idle connections per host.
    pub max_connections: usize,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Verify TLS certificates.
    pub verify_ssl: bool,

    /// Maximum number of retries for idempotent calls.
    pub max_retries: u32,

    /// Initial backoff delay for retries.
    pub initial_backoff: Duration,

    /// Maximum backoff delay.
    pub max_backoff: Duration,

    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Interval between job status fetches.
    pub poll_interval: Duration,

    /// Stop polling after this many fetches (None = unbounded).
    pub max_polls: Option<u32>,

    /// Files uploaded concurrently per batch.
    pub upload_concurrency: usize,

    /// Files registered per upload callback.
    pub callback_batch_size: usize,

    /// Files downloaded concurrently per batch.
    pub download_batch_size: usize,

    /// What to do when an item in a batch fails.
    pub failure_policy: FailurePolicy,

    /// Object storage endpoint override.
    pub storage_endpoint: Option<Url>,
}

impl std::fmt::Debug for TerraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerraConfig")
            .field("credential", &self.credential)
            .field("api_host", &self.api_host.as_str())
            .field("base_path", &self.base_path)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("max_retries", &self.max_retries)
            .field("poll_interval", &self.poll_interval)
            .field("max_polls", &self.max_polls)
            .field("upload_concurrency", &self.upload_concurrency)
            .field("callback_batch_size", &self.callback_batch_size)
            .field("download_batch_size", &self.download_batch_size)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

impl TerraConfig {
    /// Create a new configuration builder.
    pub fn builder() -> TerraConfigBuilder {
        TerraConfigBuilder::default()
    }

    /// Absolute URL of an endpoint with optional query pairs.
    ///
    /// Each segment is appended to the base path as one percent-encoded path
    /// segment, so a `/` or `?` inside a uuid cannot change the route. Query
    /// values are form-encoded; a pair list that is empty produces no `?` at
    /// all.
    pub fn endpoint_url<K, V>(&self, segments: &[&str], query: &[(K, V)]) -> Result<Url, TerraError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let raw = format!(
            "{}{}",
            self.api_host.as_str().trim_end_matches('/'),
            self.base_path
        );
        let invalid = |details: String| ConfigurationError::InvalidHost {
            url: raw.clone(),
            details,
        };
        let mut url = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// True for region-suffixed deployments such as `openapi-cn`.
    pub fn is_region_suffixed(&self) -> bool {
        self.api_host
            .host_str()
            .map(|host| host.contains("-cn"))
            .unwrap_or(false)
    }

    /// Retry settings derived from this configuration.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries)
            .with_initial_backoff(self.initial_backoff)
            .with_max_backoff(self.max_backoff)
            .with_multiplier(self.backoff_multiplier)
    }

    /// Transfer limits derived from this configuration.
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            upload_concurrency: self.upload_concurrency,
            callback_batch_size: self.callback_batch_size,
            download_batch_size: self.download_batch_size,
            failure_policy: self.failure_policy,
        }
    }
}

/// Builder for Terra configuration.
#[derive(Default)]
pub struct TerraConfigBuilder {
    credential: Option<Credential>,
    api_host: Option<String>,
    base_path: Option<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_connections: Option<usize>,
    idle_timeout: Option<Duration>,
    verify_ssl: Option<bool>,
    max_retries: Option<u32>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    backoff_multiplier: Option<f64>,
    poll_interval: Option<Duration>,
    max_polls: Option<u32>,
    upload_concurrency: Option<usize>,
    callback_batch_size: Option<usize>,
    download_batch_size: Option<usize>,
    failure_policy: Option<FailurePolicy>,
    storage_endpoint: Option<String>,
}

impl TerraConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the credential.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the API host.
    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = Some(host.into());
        self
    }

    /// Set the API base path.
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    pub fn max_connections(mut self, connections: usize) -> Self {
        self.max_connections = Some(connections);
        self
    }

    /// Set the idle connection timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Enable or disable TLS verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the initial backoff delay.
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    /// Set the maximum backoff delay.
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    /// Set the backoff multiplier.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Set the job poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Give up waiting for a job after this many status fetches.
    pub fn max_polls(mut self, polls: u32) -> Self {
        self.max_polls = Some(polls);
        self
    }

    /// Set the upload batch size.
    pub fn upload_concurrency(mut self, limit: usize) -> Self {
        self.upload_concurrency = Some(limit);
        self
    }

    /// Set the upload callback batch size.
    pub fn callback_batch_size(mut self, limit: usize) -> Self {
        self.callback_batch_size = Some(limit);
        self
    }

    /// Set the download batch size.
    pub fn download_batch_size(mut self, limit: usize) -> Self {
        self.download_batch_size = Some(limit);
        self
    }

    /// Set the partial failure policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    /// Override the object storage endpoint.
    pub fn storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.storage_endpoint = Some(endpoint.into());
        self
    }

    /// Load configuration from environment variables.
    ///
    /// A missing credential is not an error here; [`build`](Self::build)
    /// reports it.
    pub fn from_env(mut self) -> Self {
        if let Ok(credential) = Credential::from_env_vars(DJI_APP_KEY, DJI_SECRET_KEY) {
            self.credential = Some(credential);
        }

        if let Ok(host) = std::env::var(TERRA_API_HOST) {
            self.api_host = Some(host);
        }
        if let Ok(val) = std::env::var("TERRA_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.max_retries = Some(retries);
            }
        }
        if let Ok(val) = std::env::var("TERRA_POLL_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.poll_interval = Some(Duration::from_secs(secs));
            }
        }
        if let Ok(val) = std::env::var("TERRA_UPLOAD_CONCURRENCY") {
            if let Ok(limit) = val.parse() {
                self.upload_concurrency = Some(limit);
            }
        }
        if let Ok(val) = std::env::var("TERRA_CALLBACK_BATCH_SIZE") {
            if let Ok(limit) = val.parse() {
                self.callback_batch_size = Some(limit);
            }
        }
        if let Ok(val) = std::env::var("TERRA_DOWNLOAD_BATCH_SIZE") {
            if let Ok(limit) = val.parse() {
                self.download_batch_size = Some(limit);
            }
        }

        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<TerraConfig, TerraError> {
        let credential = self
            .credential
            .ok_or(ConfigurationError::MissingCredentials)?;

        let host = self
            .api_host
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        let api_host = parse_url(&host)?;

        let base_path = self
            .base_path
            .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());
        if !base_path.starts_with('/') {
            return Err(invalid("base_path", "must start with '/'"));
        }
        let base_path = base_path.trim_end_matches('/').to_string();

        let transfer = TransferConfig::default();
        let upload_concurrency = self.upload_concurrency.unwrap_or(transfer.upload_concurrency);
        let callback_batch_size = self
            .callback_batch_size
            .unwrap_or(transfer.callback_batch_size);
        let download_batch_size = self
            .download_batch_size
            .unwrap_or(transfer.download_batch_size);

        for (field, value) in [
            ("upload_concurrency", upload_concurrency),
            ("callback_batch_size", callback_batch_size),
            ("download_batch_size", download_batch_size),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }

        let storage_endpoint = match self.storage_endpoint {
            Some(endpoint) => Some(parse_url(&endpoint)?),
            None => None,
        };

        let retry = RetryConfig::default();

        Ok(TerraConfig {
            credential,
            api_host,
            base_path,
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(10)),
            read_timeout: self.read_timeout.unwrap_or(Duration::from_secs(120)),
            max_connections: self.max_connections.unwrap_or(100),
            idle_timeout: self.idle_timeout.unwrap_or(Duration::from_secs(90)),
            verify_ssl: self.verify_ssl.unwrap_or(true),
            max_retries: self.max_retries.unwrap_or(retry.max_retries),
            initial_backoff: self.initial_backoff.unwrap_or(retry.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(retry.max_backoff),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(retry.backoff_multiplier),
            poll_interval: self
                .poll_interval
                .unwrap_or(crate::poller::DEFAULT_POLL_INTERVAL),
            max_polls: self.max_polls,
            upload_concurrency,
            callback_batch_size,
            download_batch_size,
            failure_policy: self.failure_policy.unwrap_or(transfer.failure_policy),
            storage_endpoint,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, TerraError> {
    Url::parse(raw).map_err(|e| {
        ConfigurationError::InvalidHost {
            url: raw.to_string(),
            details: e.to_string(),
        }
        .into()
    })
}

fn invalid(field: &str, message: &str) -> TerraError {
    ConfigurationError::InvalidConfiguration {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}
