//! Key configuration

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::key_id::{JwkThumbprint, KeyIdentifier};
use crate::keys::{PrivateKey, PublicKey};
use crate::{JwtError, Result};

/// Serializable key settings, loaded by the embedding service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOptions {
    /// Name of the cluster issuing tokens
    pub cluster_name: String,
    /// Clock drift tolerated on time claims during verification, in seconds
    #[serde(default = "default_verify_leeway_seconds")]
    pub verify_leeway_seconds: u64,
}

fn default_verify_leeway_seconds() -> u64 {
    DEFAULT_VERIFY_LEEWAY_SECONDS as u64
}

/// Clock drift tolerated during verification unless configured otherwise
pub const DEFAULT_VERIFY_LEEWAY_SECONDS: i64 = 60;

/// Largest verification leeway a key accepts
pub const MAX_VERIFY_LEEWAY_SECONDS: i64 = 24 * 60 * 60;

/// Everything needed to build a [`crate::JwtKey`]
#[derive(Clone)]
pub struct KeyConfig {
    /// Time source, defaults to [`SystemClock`]
    pub clock: Option<Arc<dyn Clock>>,
    /// Verification key, replaced by the key derived from `private_key`
    pub public_key: Option<PublicKey>,
    /// Signing key
    pub private_key: Option<PrivateKey>,
    /// Name of the cluster issuing tokens
    pub cluster_name: String,
    /// `kid` computation, defaults to [`JwkThumbprint`]
    pub key_identifier: Option<Arc<dyn KeyIdentifier>>,
    /// Clock drift tolerated on time claims during verification, 60 seconds
    /// by default
    pub verify_leeway: Duration,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            clock: None,
            public_key: None,
            private_key: None,
            cluster_name: String::new(),
            key_identifier: None,
            verify_leeway: Duration::seconds(DEFAULT_VERIFY_LEEWAY_SECONDS),
        }
    }
}

impl KeyConfig {
    /// Configuration for `cluster_name` with no keys yet
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            ..Self::default()
        }
    }

    /// Configuration from deserialized options.
    ///
    /// An out-of-range leeway is rejected later by
    /// [`KeyConfig::check_and_set_defaults`].
    pub fn from_options(options: &KeyOptions) -> Self {
        let leeway = i64::try_from(options.verify_leeway_seconds).unwrap_or(i64::MAX);
        Self::new(options.cluster_name.clone())
            .with_verify_leeway(Duration::try_seconds(leeway).unwrap_or(Duration::MAX))
    }

    pub fn with_private_key(mut self, key: impl Into<PrivateKey>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    pub fn with_public_key(mut self, key: impl Into<PublicKey>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_key_identifier(mut self, key_identifier: Arc<dyn KeyIdentifier>) -> Self {
        self.key_identifier = Some(key_identifier);
        self
    }

    pub fn with_verify_leeway(mut self, leeway: Duration) -> Self {
        self.verify_leeway = leeway;
        self
    }

    /// Validate the configuration and fill in defaults.
    ///
    /// When a private key is present its public key replaces any configured
    /// public key.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] when neither key is present, the
    /// cluster name is empty, or the leeway is negative or above
    /// [`MAX_VERIFY_LEEWAY_SECONDS`].
    pub fn check_and_set_defaults(&mut self) -> Result<()> {
        if self.clock.is_none() {
            self.clock = Some(Arc::new(SystemClock));
        }
        if self.key_identifier.is_none() {
            self.key_identifier = Some(Arc::new(JwkThumbprint));
        }
        if let Some(private_key) = &self.private_key {
            self.public_key = Some(private_key.public_key());
        }
        if self.public_key.is_none() {
            return Err(JwtError::bad_parameter("public or private key is required"));
        }
        if self.cluster_name.is_empty() {
            return Err(JwtError::bad_parameter("cluster name is required"));
        }
        if self.verify_leeway < Duration::zero() {
            return Err(JwtError::bad_parameter("verify leeway cannot be negative"));
        }
        if self.verify_leeway > Duration::seconds(MAX_VERIFY_LEEWAY_SECONDS) {
            return Err(JwtError::bad_parameter(format!(
                "verify leeway cannot exceed {MAX_VERIFY_LEEWAY_SECONDS} seconds"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyConfig")
            .field("clock", &self.clock)
            .field("public_key", &self.public_key.as_ref().map(PublicKey::family))
            .field("private_key", &self.private_key)
            .field("cluster_name", &self.cluster_name)
            .field("key_identifier", &self.key_identifier.is_some())
            .field("verify_leeway", &self.verify_leeway)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_requires_a_key() {
        let mut config = KeyConfig::new("cluster");
        let err = config.check_and_set_defaults().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad parameter: public or private key is required"
        );
    }

    #[test]
    fn test_requires_cluster_name() {
        let signing = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let mut config = KeyConfig::default().with_private_key(signing);
        let err = config.check_and_set_defaults().unwrap_err();
        assert_eq!(err.to_string(), "Bad parameter: cluster name is required");
    }

    #[test]
    fn test_public_key_derived_from_private_key() {
        let signing = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let unrelated = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let mut config = KeyConfig::new("cluster")
            .with_public_key(unrelated.verifying_key())
            .with_private_key(signing.clone());
        config.check_and_set_defaults().unwrap();

        assert_eq!(
            config.public_key,
            Some(PublicKey::Ed25519(signing.verifying_key()))
        );
        assert!(config.clock.is_some());
        assert!(config.key_identifier.is_some());
    }

    #[test]
    fn test_options_defaults() {
        let options: KeyOptions = serde_json::from_str(r#"{"cluster_name": "prod"}"#).unwrap();
        assert_eq!(options.verify_leeway_seconds, 60);
        assert_eq!(KeyConfig::default().verify_leeway, Duration::seconds(60));

        let config = KeyConfig::from_options(&KeyOptions {
            cluster_name: "prod".into(),
            verify_leeway_seconds: 30,
        });
        assert_eq!(config.cluster_name, "prod");
        assert_eq!(config.verify_leeway, Duration::seconds(30));
    }

    #[test]
    fn test_oversized_leeway_rejected() {
        let signing = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let mut config = KeyConfig::from_options(&KeyOptions {
            cluster_name: "prod".into(),
            verify_leeway_seconds: u64::MAX,
        })
        .with_private_key(signing.clone());
        let err = config.check_and_set_defaults().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad parameter: verify leeway cannot exceed 86400 seconds"
        );

        let mut config = KeyConfig::new("prod")
            .with_private_key(signing)
            .with_verify_leeway(Duration::seconds(MAX_VERIFY_LEEWAY_SECONDS));
        assert!(config.check_and_set_defaults().is_ok());
    }
}
