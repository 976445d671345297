//! Resilience layer for API calls.
//!
//! Only transport-level retry is provided. Whether a call may be retried is
//! declared by the caller through [`Idempotency`].

mod retry;

pub use retry::{RetryConfig, RetryPolicy};

use http::Method;

/// Whether a call is safe to re-sign and resend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Safe to resend; retried on transient failure.
    Idempotent,
    /// Sent exactly once.
    NonIdempotent,
}

impl Idempotency {
    /// Default classification for a method: only GET and HEAD are
    /// idempotent unless a call opts in explicitly.
    pub fn for_method(method: &Method) -> Self {
        if method == Method::GET || method == Method::HEAD {
            Idempotency::Idempotent
        } else {
            Idempotency::NonIdempotent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_method() {
        assert_eq!(Idempotency::for_method(&Method::GET), Idempotency::Idempotent);
        assert_eq!(
            Idempotency::for_method(&Method::POST),
            Idempotency::NonIdempotent
        );
        assert_eq!(
            Idempotency::for_method(&Method::DELETE),
            Idempotency::NonIdempotent
        );
    }
}
