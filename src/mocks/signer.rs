//! Mock signer for testing.

use crate::signing::{content_digest, format_http_date, RequestSigner, SignatureHeaders, DIGEST_PREFIX};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Recorded sign call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignCall {
    /// Method as passed to the signer.
    pub method: String,
    /// Path and query.
    pub request_path: String,
    /// Payload bytes.
    pub payload: Vec<u8>,
    /// Signing time.
    pub issued_at: DateTime<Utc>,
}

/// Signer that records its inputs.
///
/// Produces a real `Date` and `Digest` and a fixed `Authorization` value.
#[derive(Debug, Default)]
pub struct MockSigner {
    calls: Mutex<Vec<SignCall>>,
}

impl MockSigner {
    /// Authorization header value produced by every call.
    pub const AUTHORIZATION: &'static str = "hmac username=\"mock\", signature=\"mock\"";

    /// Create a new mock signer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<SignCall> {
        self.calls.lock().clone()
    }

    /// Get the number of sign calls.
    pub fn sign_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl RequestSigner for MockSigner {
    fn sign(
        &self,
        method: &str,
        request_path: &str,
        payload: &[u8],
        issued_at: DateTime<Utc>,
    ) -> SignatureHeaders {
        self.calls.lock().push(SignCall {
            method: method.to_string(),
            request_path: request_path.to_string(),
            payload: payload.to_vec(),
            issued_at,
        });

        SignatureHeaders {
            date: format_http_date(&issued_at),
            digest: format!("{}{}", DIGEST_PREFIX, content_digest(payload)),
            authorization: Self::AUTHORIZATION.to_string(),
        }
    }
}
