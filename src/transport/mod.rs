//! HTTP transport layer.
//!
//! Signed API calls and unsigned downloads of pre-authorised object URLs
//! share one [`HttpTransport`]. The transport moves bytes only: signing,
//! retries and envelope decoding happen above it.

use crate::config::TerraConfig;
use crate::error::{ConfigurationError, NetworkError, TerraError};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// A request ready for the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Headers, including the signature headers for API calls.
    pub headers: HashMap<String, String>,
    /// Body bytes; `None` sends no body at all.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// A request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Attach a body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a header, replacing any previous value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set several headers.
    pub fn with_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |request, (name, value)| request.with_header(name, value))
    }

    /// Header value, matched case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response as read off the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Headers; values that are not valid UTF-8 are dropped.
    pub headers: HashMap<String, String>,
    /// Full body.
    pub body: Bytes,
}

impl HttpResponse {
    /// 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 5xx.
    pub fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Header value, matched case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `Retry-After` given in whole seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        let seconds: u64 = self.get_header("retry-after")?.trim().parse().ok()?;
        Some(Duration::from_secs(seconds))
    }
}

/// Sends one request and returns the full response.
///
/// Non-2xx statuses are responses, not errors. Only failures to exchange
/// bytes with the server are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TerraError>;
}

/// [`HttpTransport`] over a pooled `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::Client,
    read_timeout: Duration,
}

impl ReqwestTransport {
    /// Transport with default timeouts and pool settings.
    pub fn new() -> Result<Self, TerraError> {
        ReqwestTransportBuilder::default().build()
    }

    /// Transport using the timeouts, pool size and TLS setting of `config`.
    pub fn from_config(config: &TerraConfig) -> Result<Self, TerraError> {
        Self::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .max_idle_connections(config.max_connections)
            .idle_timeout(config.idle_timeout)
            .verify_ssl(config.verify_ssl)
            .build()
    }

    /// Start a builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    fn classify(&self, error: reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            return NetworkError::Timeout {
                duration: self.read_timeout,
            };
        }
        if error.is_builder() {
            return NetworkError::InvalidRequest {
                message: error.to_string(),
            };
        }
        NetworkError::ConnectionFailed {
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TerraError> {
        trace!(method = %request.method, url = %request.url, "Sending HTTP request");

        let builder = request.headers.iter().fold(
            self.client.request(request.method.clone(), &request.url),
            |builder, (name, value)| builder.header(name.as_str(), value.as_str()),
        );
        let builder = match request.body {
            Some(body) => builder.body(body),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        trace!(status = status, body_len = body.len(), "Received HTTP response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    read_timeout: Duration,
    max_idle_connections: usize,
    idle_timeout: Duration,
    verify_ssl: bool,
    user_agent: String,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            max_idle_connections: 32,
            idle_timeout: Duration::from_secs(90),
            verify_ssl: true,
            user_agent: concat!("terra-api-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ReqwestTransportBuilder {
    /// Time allowed to establish a connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Time allowed for a whole request, body included.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Idle connections kept per host.
    pub fn max_idle_connections(mut self, max: usize) -> Self {
        self.max_idle_connections = max;
        self
    }

    /// How long an idle connection is kept.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Verify server certificates. Disable only against local test servers.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// User-Agent header value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport, TerraError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .pool_max_idle_per_host(self.max_idle_connections)
            .pool_idle_timeout(self.idle_timeout)
            .danger_accept_invalid_certs(!self.verify_ssl)
            .user_agent(self.user_agent)
            .build()
            .map_err(|e| ConfigurationError::HttpClient {
                message: e.to_string(),
            })?;

        Ok(ReqwestTransport {
            client,
            read_timeout: self.read_timeout,
        })
    }
}
