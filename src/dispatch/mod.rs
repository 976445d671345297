//! Typed request dispatch.
//!
//! Every API response is wrapped in an envelope:
//!
//! ```json
//! {"result": {"code": 0, "msg": "", "desc": ""}, "data": {...}}
//! ```
//!
//! [`Dispatcher`] signs and sends an [`ApiCall`], retries it when it is
//! idempotent, and decodes the envelope into an [`ApiOutcome`]. A retried
//! call goes back through the request builder, so each attempt carries its
//! own date and signature.

use crate::config::TerraConfig;
use crate::error::{RemoteError, ResponseError, ServerError, TerraError};
use crate::request::{Payload, RequestBuilder};
use crate::resilience::{Idempotency, RetryPolicy};
use crate::signing::RequestSigner;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use bytes::Bytes;
use http::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Header asking create endpoints to return the full record.
pub const RETURN_DETAIL: (&str, &str) = ("Return-Detail", "true");

const BODY_EXCERPT_LIMIT: usize = 512;

/// Result block of the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultStatus {
    /// 0 on success.
    pub code: i64,
    /// Human-readable message.
    #[serde(default)]
    pub msg: String,
    /// Additional description.
    #[serde(default)]
    pub desc: String,
}

/// Response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Result status.
    pub result: ResultStatus,
    /// Payload, absent for some calls.
    pub data: Option<T>,
}

/// Decoded outcome of one call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    /// Result code 0 with data.
    Success(T),
    /// Non-zero result code.
    Failure {
        /// Result code.
        code: i64,
        /// Result message, verbatim.
        message: String,
    },
}

impl<T> ApiOutcome<T> {
    /// Interpret an envelope. A success without data is a decode error.
    pub fn from_envelope(envelope: ApiEnvelope<T>, endpoint: &str) -> Result<Self, TerraError> {
        if envelope.result.code != 0 {
            return Ok(ApiOutcome::Failure {
                code: envelope.result.code,
                message: envelope.result.msg,
            });
        }
        match envelope.data {
            Some(data) => Ok(ApiOutcome::Success(data)),
            None => Err(ResponseError::MissingData {
                endpoint: endpoint.to_string(),
            }
            .into()),
        }
    }

    /// Returns true on success.
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    /// Convert into a result, turning a failure into [`RemoteError`].
    pub fn into_result(self) -> Result<T, TerraError> {
        match self {
            ApiOutcome::Success(data) => Ok(data),
            ApiOutcome::Failure { code, message } => Err(RemoteError::new(code, message).into()),
        }
    }
}

/// One call to the API.
#[derive(Debug, Clone)]
pub struct ApiCall {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: Url,
    /// Payload.
    pub payload: Payload,
    /// Headers sent besides the signature headers.
    pub headers: Vec<(String, String)>,
    /// Whether the call may be resent.
    pub idempotency: Idempotency,
}

impl ApiCall {
    /// Create a call with the default idempotency for its method.
    pub fn new(method: Method, url: Url) -> Self {
        let idempotency = Idempotency::for_method(&method);
        Self {
            method,
            url,
            payload: Payload::Empty,
            headers: Vec::new(),
            idempotency,
        }
    }

    /// GET call.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST call.
    pub fn post(url: Url, payload: Payload) -> Self {
        Self::new(Method::POST, url).with_payload(payload)
    }

    /// DELETE call.
    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Mark the call as safe to re-sign and resend.
    pub fn idempotent(mut self) -> Self {
        self.idempotency = Idempotency::Idempotent;
        self
    }

    fn endpoint(&self) -> &str {
        self.url.path()
    }
}

/// Sends signed calls and decodes envelopes.
pub struct Dispatcher {
    config: Arc<TerraConfig>,
    transport: Arc<dyn HttpTransport>,
    builder: RequestBuilder,
    retry: RetryPolicy,
}

impl Dispatcher {
    /// Create a new dispatcher.
    pub fn new(
        config: Arc<TerraConfig>,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn RequestSigner>,
    ) -> Self {
        let retry = RetryPolicy::new(config.retry_config());
        Self {
            config,
            transport,
            builder: RequestBuilder::new(signer),
            retry,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &TerraConfig {
        &self.config
    }

    /// URL of an endpoint under the API base path, one segment per element.
    pub fn url(&self, segments: &[&str]) -> Result<Url, TerraError> {
        let none: [(&str, &str); 0] = [];
        self.config.endpoint_url(segments, &none)
    }

    /// URL of an endpoint with query pairs.
    pub fn url_with_query<K, V>(&self, segments: &[&str], query: &[(K, V)]) -> Result<Url, TerraError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.config.endpoint_url(segments, query)
    }

    /// Send a call and decode its envelope.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        call: &ApiCall,
    ) -> Result<ApiOutcome<T>, TerraError> {
        let response = self.send_signed(call).await?;
        let envelope: ApiEnvelope<T> = decode_envelope(&response)?;
        ApiOutcome::from_envelope(envelope, call.endpoint())
    }

    /// Send a call and return its data.
    pub async fn call<T: DeserializeOwned>(&self, call: &ApiCall) -> Result<T, TerraError> {
        self.execute(call).await?.into_result()
    }

    /// Send a call whose data is ignored.
    pub async fn call_unit(&self, call: &ApiCall) -> Result<(), TerraError> {
        let response = self.send_signed(call).await?;
        let envelope: ApiEnvelope<IgnoredAny> = decode_envelope(&response)?;
        if envelope.result.code != 0 {
            return Err(RemoteError::new(envelope.result.code, envelope.result.msg).into());
        }
        Ok(())
    }

    /// Unsigned GET of a pre-authorised URL, retried like any idempotent call.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, TerraError> {
        let response = self
            .retry
            .execute(Idempotency::Idempotent, || async {
                let response = self
                    .transport
                    .send(HttpRequest::new(Method::GET, url))
                    .await?;
                check_status(response)
            })
            .await?;

        if !response.is_success() {
            return Err(ServerError::UnexpectedStatus {
                status: response.status,
                message: body_excerpt(&response.body),
            }
            .into());
        }
        Ok(response.body)
    }

    async fn send_signed(&self, call: &ApiCall) -> Result<HttpResponse, TerraError> {
        let response = self
            .retry
            .execute(call.idempotency, || async {
                let signed = self.builder.build(call.method.clone(), call.url.as_str(), &call.payload)?;
                debug!(
                    method = %call.method,
                    target = %signed.target,
                    body_len = signed.body.len(),
                    "Sending signed request"
                );
                let request = signed.into_http_request().with_headers(call.headers.clone());
                let response = self.transport.send(request).await?;
                check_status(response)
            })
            .await?;

        debug!(
            status = response.status,
            endpoint = call.endpoint(),
            "Received response"
        );
        Ok(response)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Map retryable HTTP statuses to errors; everything else is returned.
fn check_status(response: HttpResponse) -> Result<HttpResponse, TerraError> {
    if response.status == 429 {
        return Err(ServerError::TooManyRequests {
            retry_after: response.retry_after(),
        }
        .into());
    }
    if response.is_server_error() {
        return Err(ServerError::Internal {
            status: response.status,
            message: body_excerpt(&response.body),
        }
        .into());
    }
    Ok(response)
}

/// Decode an envelope. Non-2xx responses without a readable envelope are
/// reported by status.
fn decode_envelope<T: DeserializeOwned>(response: &HttpResponse) -> Result<ApiEnvelope<T>, TerraError> {
    match serde_json::from_slice::<ApiEnvelope<T>>(&response.body) {
        Ok(envelope) => {
            if !response.is_success() && envelope.result.code == 0 {
                return Err(ServerError::UnexpectedStatus {
                    status: response.status,
                    message: envelope.result.msg,
                }
                .into());
            }
            Ok(envelope)
        }
        Err(e) if response.is_success() => {
            warn!(status = response.status, error = %e, "Undecodable response envelope");
            Err(ResponseError::Decode {
                message: e.to_string(),
            }
            .into())
        }
        Err(_) => Err(ServerError::UnexpectedStatus {
            status: response.status,
            message: body_excerpt(&response.body),
        }
        .into()),
    }
}

fn body_excerpt(body: &[u8]) -> String {
    let end = body.len().min(BODY_EXCERPT_LIMIT);
    String::from_utf8_lossy(&body[..end]).into_owned()
}
