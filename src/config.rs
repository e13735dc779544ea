//! Session configuration: key material and issuance policy.

use chrono::Duration;
use secrecy::SecretSlice;

use crate::error::Error;
use crate::token::refresh::{ENCRYPTION_IV_LEN, ENCRYPTION_KEY_LEN};

const DEFAULT_VALIDITY_MINUTES: i64 = 60;
const DEFAULT_ISSUER: &str = "sesio";

/// Recognized options for the session manager and its codecs.
///
/// Key material is wrapped in [`SecretSlice`] so it never shows up in debug
/// output. Lengths are validated here, once, so the codecs can assume them.
pub struct SessionConfig {
    pub(crate) signing_key: SecretSlice<u8>,
    pub(crate) encryption_key: SecretSlice<u8>,
    pub(crate) encryption_iv: Vec<u8>,
    pub(crate) validity: Duration,
    pub(crate) issuer: String,
}

impl SessionConfig {
    /// Build a configuration from raw key material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] if the signing key is empty, the
    /// encryption key is not 32 bytes, or the IV is not 16 bytes.
    pub fn new(
        signing_key: Vec<u8>,
        encryption_key: Vec<u8>,
        encryption_iv: Vec<u8>,
    ) -> Result<Self, Error> {
        if signing_key.is_empty() {
            return Err(Error::InvalidKeyLength);
        }
        if encryption_key.len() != ENCRYPTION_KEY_LEN {
            return Err(Error::InvalidKeyLength);
        }
        if encryption_iv.len() != ENCRYPTION_IV_LEN {
            return Err(Error::InvalidKeyLength);
        }

        Ok(Self {
            signing_key: SecretSlice::from(signing_key),
            encryption_key: SecretSlice::from(encryption_key),
            encryption_iv,
            validity: Duration::minutes(DEFAULT_VALIDITY_MINUTES),
            issuer: DEFAULT_ISSUER.to_string(),
        })
    }

    /// Validity window applied to every session at creation and refresh.
    #[must_use]
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Issuer claim stamped into access tokens.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_key_lengths() {
        assert!(matches!(
            SessionConfig::new(vec![], vec![0; 32], vec![0; 16]),
            Err(Error::InvalidKeyLength)
        ));
        assert!(matches!(
            SessionConfig::new(vec![1; 8], vec![0; 16], vec![0; 16]),
            Err(Error::InvalidKeyLength)
        ));
        assert!(matches!(
            SessionConfig::new(vec![1; 8], vec![0; 32], vec![0; 12]),
            Err(Error::InvalidKeyLength)
        ));
    }

    #[test]
    fn defaults_apply() -> Result<(), Error> {
        let config = SessionConfig::new(vec![1; 8], vec![0; 32], vec![0; 16])?;
        assert_eq!(config.validity, Duration::minutes(60));
        assert_eq!(config.issuer, "sesio");
        Ok(())
    }
}
