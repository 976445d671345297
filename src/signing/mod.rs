//! HMAC request signing.
//!
//! Every call carries three headers derived from the exact bytes on the wire:
//!
//! ```text
//! Date: Tue, 15 Oct 2024 08:30:05 GMT
//! Digest: SHA-256=<base64(sha256(body))>
//! Authorization: hmac username="<app key>", algorithm="hmac-sha256",
//!                headers="date @request-target digest", signature="<sig>"
//! ```
//!
//! where `sig = base64(hmac_sha256(secret, signing_string))` and the signing
//! string is
//!
//! ```text
//! date: <Date>\n@request-target: <lowercase method> <path?query>\ndigest: SHA-256=<digest>
//! ```

mod signer;

pub use signer::{HmacSigner, RequestSigner, SignatureHeaders};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Algorithm name advertised in the `Authorization` header.
pub const ALGORITHM: &str = "hmac-sha256";

/// Pseudo-headers covered by the signature, in signing order.
pub const SIGNED_HEADERS: &str = "date @request-target digest";

/// Prefix of the `Digest` header value.
pub const DIGEST_PREFIX: &str = "SHA-256=";

/// Calculate `base64(sha256(data))`.
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    STANDARD.encode(hasher.finalize())
}

/// Calculate HMAC-SHA256.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Format a timestamp as an RFC 7231 IMF-fixdate, e.g.
/// `Tue, 15 Oct 2024 08:30:05 GMT`.
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build the canonical signing string.
///
/// `method` is lower-cased here and only here; `request_path` is the path
/// plus query string without scheme or host.
pub fn build_signing_string(date: &str, method: &str, request_path: &str, digest: &str) -> String {
    format!(
        "date: {}\n@request-target: {} {}\ndigest: {}{}",
        date,
        method.to_lowercase(),
        request_path,
        DIGEST_PREFIX,
        digest
    )
}

/// Build the `Authorization` header value.
pub fn build_authorization(app_key: &str, signature: &str) -> String {
    format!(
        "hmac username=\"{}\", algorithm=\"{}\", headers=\"{}\", signature=\"{}\"",
        app_key, ALGORITHM, SIGNED_HEADERS, signature
    )
}
