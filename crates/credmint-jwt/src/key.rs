//! The signing and verification context

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::algorithm::{SigningAlgorithm, algorithm_for_public_key};
use crate::claims::{RegisteredClaims, TokenClaims};
use crate::clock::Clock;
use crate::config::KeyConfig;
use crate::key_id::KeyIdentifier;
use crate::keys::PublicKey;
use crate::signer::{HeaderOptions, Signer};
use crate::token::UnverifiedToken;
use crate::verifier::{Expected, verify_signature};
use crate::{JwtError, Result};

/// A key pair, or a lone public key, bound to a cluster and a clock.
///
/// Immutable once built. Share it behind an `Arc` across threads; rotate by
/// building a new one.
pub struct JwtKey {
    clock: Arc<dyn Clock>,
    public_key: PublicKey,
    algorithm: SigningAlgorithm,
    signer: Option<Signer>,
    cluster_name: String,
    key_identifier: Arc<dyn KeyIdentifier>,
    verify_leeway: Duration,
}

impl JwtKey {
    /// Build a key from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for an incomplete configuration and
    /// [`JwtError::UnsupportedKeyType`] when the key family has no mandated
    /// algorithm.
    pub fn new(mut config: KeyConfig) -> Result<Self> {
        config
            .check_and_set_defaults()
            .map_err(|e| e.context("configure key"))?;

        let (Some(clock), Some(public_key), Some(key_identifier)) =
            (config.clock, config.public_key, config.key_identifier)
        else {
            return Err(JwtError::bad_parameter("configure key: defaults not applied"));
        };
        let algorithm =
            algorithm_for_public_key(&public_key).map_err(|e| e.context("configure key"))?;
        let signer = config
            .private_key
            .map(Signer::new)
            .transpose()
            .map_err(|e| e.context("configure key"))?;

        tracing::debug!(
            cluster = %config.cluster_name,
            algorithm = %algorithm,
            can_sign = signer.is_some(),
            "JWT key configured"
        );

        Ok(Self {
            clock,
            public_key,
            algorithm,
            signer,
            cluster_name: config.cluster_name,
            key_identifier,
            verify_leeway: config.verify_leeway,
        })
    }

    /// Verification key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Algorithm of every token this key signs or accepts
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Cluster the key belongs to
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Whether a private key is present
    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    /// Current time from the injected clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Identifier for the `kid` header
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::KeyIdUnavailable`] when the identifier cannot be
    /// computed.
    pub fn key_id(&self) -> Result<String> {
        self.key_identifier
            .key_id(&self.public_key)
            .map_err(|e| match e {
                JwtError::KeyIdUnavailable { .. } => e,
                other => JwtError::KeyIdUnavailable {
                    reason: other.to_string(),
                },
            })
    }

    /// `kid` when it can be computed, nothing otherwise
    pub(crate) fn best_effort_key_id(&self) -> Option<String> {
        match self.key_id() {
            Ok(kid) => Some(kid),
            Err(e) => {
                tracing::trace!(error = %e, "omitting kid header");
                None
            }
        }
    }

    fn signer(&self) -> Result<&Signer> {
        self.signer
            .as_ref()
            .ok_or_else(|| JwtError::bad_parameter("cannot sign without private key"))
    }

    /// Sign one of the supported claim shapes
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] without a private key and
    /// [`JwtError::SigningFailed`] when the signature cannot be produced.
    pub fn sign_claims(&self, claims: &TokenClaims, options: &HeaderOptions) -> Result<String> {
        self.issue(claims.kind(), claims, options)
    }

    pub(crate) fn issue(
        &self,
        profile: &'static str,
        claims: &TokenClaims,
        options: &HeaderOptions,
    ) -> Result<String> {
        let token = self.signer()?.sign(claims, options)?;
        tracing::debug!(
            profile,
            algorithm = %self.algorithm,
            kid = options.key_id.is_some(),
            "token issued"
        );
        Ok(token)
    }

    /// Sign an arbitrary byte payload as a compact JWS
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] without a private key and
    /// [`JwtError::SigningFailed`] when the signature cannot be produced.
    pub fn sign_payload(&self, payload: &[u8], options: &HeaderOptions) -> Result<String> {
        self.signer()
            .and_then(|signer| signer.sign_payload(payload, options))
            .map_err(|e| e.context("sign payload"))
    }

    /// Verify signature and expected claims, then decode the claims into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::MalformedToken`] when `raw` is not a compact JWS
    /// and [`JwtError::InvalidToken`] for any signature or claim failure.
    pub fn verify<T: DeserializeOwned>(&self, raw: &str, expected: &Expected) -> Result<T> {
        let claims = self.verified_claims(raw)?;
        let registered: RegisteredClaims = decode_verified(&claims)?;
        expected.validate(&registered, self.verify_leeway)?;
        decode_verified(&claims)
    }

    /// Verify the signature only and decode the claims into `T`.
    ///
    /// No issuer, subject, audience or time checks are made. Every trust
    /// decision on the returned claims belongs to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::MalformedToken`] when `raw` is not a compact JWS
    /// and [`JwtError::InvalidToken`] when the signature does not verify or
    /// the claims do not fit `T`.
    pub fn verify_signature_only<T: DeserializeOwned>(&self, raw: &str) -> Result<T> {
        let claims = self.verified_claims(raw)?;
        decode_verified(&claims)
    }

    fn verified_claims(&self, raw: &str) -> Result<Value> {
        UnverifiedToken::parse(raw)?;
        let claims = verify_signature(raw, &self.public_key, self.algorithm)?;
        Ok(Value::Object(claims))
    }
}

fn decode_verified<T: DeserializeOwned>(claims: &Value) -> Result<T> {
    T::deserialize(claims).map_err(|e| {
        tracing::trace!(error = %e, "verified claims do not decode");
        JwtError::InvalidToken
    })
}

impl fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKey")
            .field("cluster_name", &self.cluster_name)
            .field("algorithm", &self.algorithm)
            .field("public_key", &self.public_key.family())
            .field("can_sign", &self.can_sign())
            .field("verify_leeway", &self.verify_leeway)
            .finish_non_exhaustive()
    }
}
