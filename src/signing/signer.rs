//! HMAC signer implementation.

use super::*;
use crate::credentials::Credential;
use chrono::{DateTime, Utc};

/// Headers produced by signing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    /// `Date` header value.
    pub date: String,
    /// `Digest` header value, `SHA-256=<digest>`.
    pub digest: String,
    /// `Authorization` header value.
    pub authorization: String,
}

impl SignatureHeaders {
    /// Header name/value pairs in emission order.
    pub fn to_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("Date", self.date.as_str()),
            ("Digest", self.digest.as_str()),
            ("Authorization", self.authorization.as_str()),
        ]
    }
}

/// Trait for request signers.
pub trait RequestSigner: Send + Sync {
    /// Sign one request.
    ///
    /// `request_path` is the path plus query string only. `payload` is the
    /// exact byte sequence that will be transmitted.
    fn sign(
        &self,
        method: &str,
        request_path: &str,
        payload: &[u8],
        issued_at: DateTime<Utc>,
    ) -> SignatureHeaders;
}

/// HMAC-SHA256 signer bound to one credential.
pub struct HmacSigner {
    credential: Credential,
}

impl HmacSigner {
    /// Create a new signer.
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    /// Get the application key this signer signs as.
    pub fn app_key(&self) -> &str {
        self.credential.app_key()
    }
}

impl RequestSigner for HmacSigner {
    fn sign(
        &self,
        method: &str,
        request_path: &str,
        payload: &[u8],
        issued_at: DateTime<Utc>,
    ) -> SignatureHeaders {
        let digest = content_digest(payload);
        let date = format_http_date(&issued_at);
        let signing_string = build_signing_string(&date, method, request_path, &digest);
        let signature = STANDARD.encode(hmac_sha256(
            self.credential.secret_key(),
            signing_string.as_bytes(),
        ));

        SignatureHeaders {
            date,
            digest: format!("{}{}", DIGEST_PREFIX, digest),
            authorization: build_authorization(self.credential.app_key(), &signature),
        }
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("app_key", &self.credential.app_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_signer() -> HmacSigner {
        HmacSigner::new(Credential::new("test-app", "test-secret").unwrap())
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 15, 8, 30, 5).unwrap()
    }

    #[test]
    fn test_sign_post_with_body() {
        let signer = create_test_signer();
        let headers = signer.sign(
            "POST",
            "/terra-rescon-be/v2/resources",
            br#"{"name":"survey","type":"map"}"#,
            issued_at(),
        );

        assert_eq!(headers.date, "Tue, 15 Oct 2024 08:30:05 GMT");
        assert_eq!(
            headers.digest,
            "SHA-256=iM1ImxX1LhGoth4ZrFGTB+jx/BES6G3mdW6/SLt5rXs="
        );
        assert_eq!(
            headers.authorization,
            "hmac username=\"test-app\", algorithm=\"hmac-sha256\", \
             headers=\"date @request-target digest\", \
             signature=\"3frhZQR/w6VRwAm92aO4B5JEa+pGeTGd62/UOGxlh4c=\""
        );
    }

    #[test]
    fn test_sign_get_with_query() {
        let signer = create_test_signer();
        let headers = signer.sign(
            "get",
            "/terra-rescon-be/v2/resources?rows=10&page=1",
            b"",
            issued_at(),
        );

        assert_eq!(
            headers.digest,
            "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
        assert!(headers
            .authorization
            .ends_with("signature=\"nAvIXaL7vp4ZRnwZvlmK2V/BgGV6wBkFwN2L+OCKiDk=\""));
    }

    #[test]
    fn test_method_case_does_not_change_signature() {
        let signer = create_test_signer();
        let upper = signer.sign("GET", "/a", b"", issued_at());
        let lower = signer.sign("get", "/a", b"", issued_at());
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_each_input_changes_signature() {
        let signer = create_test_signer();
        let base = signer.sign("post", "/a", b"x", issued_at());

        let other_method = signer.sign("put", "/a", b"x", issued_at());
        let other_path = signer.sign("post", "/b", b"x", issued_at());
        let other_body = signer.sign("post", "/a", b"y", issued_at());
        let other_time = signer.sign(
            "post",
            "/a",
            b"x",
            issued_at() + chrono::Duration::seconds(1),
        );

        for other in [other_method, other_path, other_body, other_time] {
            assert_ne!(base.authorization, other.authorization);
        }
    }

    #[test]
    fn test_other_secret_changes_signature() {
        let a = create_test_signer().sign("get", "/a", b"", issued_at());
        let b = HmacSigner::new(Credential::new("test-app", "other-secret").unwrap())
            .sign("get", "/a", b"", issued_at());
        assert_ne!(a.authorization, b.authorization);
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn test_debug_hides_secret() {
        let debug = format!("{:?}", create_test_signer());
        assert!(!debug.contains("test-secret"));
    }
}
