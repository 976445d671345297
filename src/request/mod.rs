//! Authenticated request construction.
//!
//! [`RequestBuilder::build`] turns a method, an absolute URL and a payload
//! into a [`SignedRequest`]. The payload is serialized once, signed, and the
//! same bytes are carried as the body, so the `Digest` header always
//! describes what is transmitted.

use crate::error::{SigningError, TerraError};
use crate::signing::{RequestSigner, SignatureHeaders};
use crate::transport::HttpRequest;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::Method;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Content type sent with non-empty bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Request payload before serialization.
#[derive(Debug, Clone)]
pub enum Payload {
    /// No body; signed as the empty byte sequence.
    Empty,
    /// Pre-serialized text sent as-is.
    Text(String),
    /// JSON value, serialized compactly.
    Json(serde_json::Value),
}

impl Payload {
    /// Serialize any value into a JSON payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, TerraError> {
        let value = serde_json::to_value(value).map_err(|e| SigningError::PayloadSerialization {
            message: e.to_string(),
        })?;
        Ok(Payload::Json(value))
    }

    /// The exact bytes that will be signed and sent.
    pub fn to_bytes(&self) -> Result<Bytes, TerraError> {
        match self {
            Payload::Empty => Ok(Bytes::new()),
            Payload::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            Payload::Json(value) => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| {
                    SigningError::PayloadSerialization {
                        message: e.to_string(),
                    }
                    .into()
                }),
        }
    }
}

/// A request signed for one transmission.
///
/// Built fresh for every attempt; never cached or replayed.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Path plus query string that was signed.
    pub target: String,
    /// Exact body bytes.
    pub body: Bytes,
    /// Signature headers.
    pub signature: SignatureHeaders,
    /// Content type, present only for non-empty bodies.
    pub content_type: Option<&'static str>,
}

impl SignedRequest {
    /// All headers to send, signature headers first.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .signature
            .to_pairs()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(content_type) = self.content_type {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }
        headers
    }

    /// Convert into a transport request.
    pub fn into_http_request(self) -> HttpRequest {
        let headers = self.headers();
        let request = HttpRequest::new(self.method, self.url).with_headers(headers);
        if self.body.is_empty() {
            request
        } else {
            request.with_body(self.body)
        }
    }
}

/// Extract the path plus query string from an absolute URL.
pub fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Builds signed requests with a shared signer.
#[derive(Clone)]
pub struct RequestBuilder {
    signer: Arc<dyn RequestSigner>,
}

impl RequestBuilder {
    /// Create a new builder.
    pub fn new(signer: Arc<dyn RequestSigner>) -> Self {
        Self { signer }
    }

    /// Build a request signed at the current time.
    pub fn build(
        &self,
        method: Method,
        url: &str,
        payload: &Payload,
    ) -> Result<SignedRequest, TerraError> {
        self.build_at(method, url, payload, Utc::now())
    }

    /// Build a request signed at an explicit time.
    pub fn build_at(
        &self,
        method: Method,
        url: &str,
        payload: &Payload,
        issued_at: DateTime<Utc>,
    ) -> Result<SignedRequest, TerraError> {
        let parsed = Url::parse(url).map_err(|e| SigningError::InvalidUrl {
            url: url.to_string(),
            details: e.to_string(),
        })?;
        let target = request_target(&parsed);
        let body = payload.to_bytes()?;
        let signature = self
            .signer
            .sign(method.as_str(), &target, &body, issued_at);
        let content_type = if body.is_empty() {
            None
        } else {
            Some(JSON_CONTENT_TYPE)
        };

        Ok(SignedRequest {
            method,
            url: parsed.to_string(),
            target,
            body,
            signature,
            content_type,
        })
    }
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder").finish_non_exhaustive()
    }
}
