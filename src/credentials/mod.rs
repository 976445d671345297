//! Application credentials.
//!
//! A [`Credential`] pairs the application key (sent in clear as the HMAC
//! `username`) with the secret key used to sign requests. It is read once
//! when the client is built and never changes afterwards.

use crate::error::{ConfigurationError, TerraError};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::fmt;

/// Environment variable holding the application key.
pub const DJI_APP_KEY: &str = "DJI_APP_KEY";
/// Environment variable holding the secret key.
pub const DJI_SECRET_KEY: &str = "DJI_SECRET_KEY";

/// Application key and secret key.
#[derive(Clone)]
pub struct Credential {
    app_key: String,
    secret_key: SecretString,
}

impl Credential {
    /// Create a credential from explicit values.
    ///
    /// Empty values are rejected: a client without a usable secret cannot
    /// sign anything.
    pub fn new(
        app_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, TerraError> {
        let app_key = app_key.into();
        let secret_key = secret_key.into();
        if app_key.is_empty() || secret_key.is_empty() {
            return Err(ConfigurationError::MissingCredentials.into());
        }
        Ok(Self {
            app_key,
            secret_key: SecretString::new(secret_key),
        })
    }

    /// Read the credential from `DJI_APP_KEY` and `DJI_SECRET_KEY`.
    pub fn from_env() -> Result<Self, TerraError> {
        Self::from_env_vars(DJI_APP_KEY, DJI_SECRET_KEY)
    }

    /// Read the credential from custom variable names.
    pub fn from_env_vars(app_key_var: &str, secret_key_var: &str) -> Result<Self, TerraError> {
        let app_key =
            env::var(app_key_var).map_err(|_| ConfigurationError::MissingCredentials)?;
        let secret_key =
            env::var(secret_key_var).map_err(|_| ConfigurationError::MissingCredentials)?;
        Self::new(app_key, secret_key)
    }

    /// Get the application key.
    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// Get the secret key bytes used as the HMAC key.
    ///
    /// Note: This exposes the secret. Avoid logging.
    pub fn secret_key(&self) -> &[u8] {
        self.secret_key.expose_secret().as_bytes()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("app_key", &self.app_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty() {
        assert!(Credential::new("", "secret").is_err());
        assert!(Credential::new("key", "").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = Credential::new("app-key", "super-secret").unwrap();
        let debug = format!("{:?}", credential);
        assert!(debug.contains("app-key"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_env_vars_missing() {
        let result = Credential::from_env_vars(
            "TERRA_TEST_MISSING_APP_KEY_VAR",
            "TERRA_TEST_MISSING_SECRET_VAR",
        );
        assert!(matches!(
            result,
            Err(TerraError::Configuration(ConfigurationError::MissingCredentials))
        ));
    }

    #[test]
    fn test_from_env_vars_present() {
        env::set_var("TERRA_TEST_CRED_APP_KEY", "app");
        env::set_var("TERRA_TEST_CRED_SECRET", "secret");
        let credential =
            Credential::from_env_vars("TERRA_TEST_CRED_APP_KEY", "TERRA_TEST_CRED_SECRET")
                .unwrap();
        assert_eq!(credential.app_key(), "app");
        assert_eq!(credential.secret_key(), b"secret");
        env::remove_var("TERRA_TEST_CRED_APP_KEY");
        env::remove_var("TERRA_TEST_CRED_SECRET");
    }
}
