//! Common test utilities for integration tests
//!
//! Key generation for the supported families, a frozen clock, and helpers to
//! look inside or damage compact tokens.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use credmint_jwt::{
    JwtError, JwtKey, KeyConfig, KeyIdentifier, ManualClock, OpaqueSigner, PrivateKey, PublicKey,
    Result, SignatureFormat,
};
use rand::rngs::OsRng;
use serde_json::Value;
use signature::Signer as _;

pub const CLUSTER: &str = "example-cluster";

/// Fixed signing time used across tests
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(fixed_now()))
}

/// 2048-bit RSA key, generated once per test binary
pub fn rsa_key() -> rsa::RsaPrivateKey {
    static KEY: OnceLock<rsa::RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| rsa::RsaPrivateKey::new(&mut OsRng, 2048).unwrap())
        .clone()
}

pub fn ec_key() -> p256::ecdsa::SigningKey {
    p256::ecdsa::SigningKey::random(&mut OsRng)
}

pub fn ed_key() -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::generate(&mut OsRng)
}

/// Signing key on the shared manual clock
pub fn signing_key(private_key: impl Into<PrivateKey>, clock: &Arc<ManualClock>) -> JwtKey {
    JwtKey::new(
        KeyConfig::new(CLUSTER)
            .with_private_key(private_key)
            .with_clock(clock.clone()),
    )
    .unwrap()
}

/// Verification-only key on the shared manual clock
pub fn verifying_key(public_key: impl Into<PublicKey>, clock: &Arc<ManualClock>) -> JwtKey {
    JwtKey::new(
        KeyConfig::new(CLUSTER)
            .with_public_key(public_key)
            .with_clock(clock.clone()),
    )
    .unwrap()
}

/// Key identifier that always fails
#[derive(Debug)]
pub struct FailingKeyIdentifier;

impl KeyIdentifier for FailingKeyIdentifier {
    fn key_id(&self, _key: &PublicKey) -> Result<String> {
        Err(JwtError::KeyIdUnavailable {
            reason: "key registry offline".to_string(),
        })
    }
}

/// P-256 signer standing in for an HSM, answering in ASN.1 DER
#[derive(Debug)]
pub struct DerEcdsaSigner(pub p256::ecdsa::SigningKey);

impl OpaqueSigner for DerEcdsaSigner {
    fn public_key(&self) -> PublicKey {
        PublicKey::EcdsaP256(*self.0.verifying_key())
    }

    fn signature_format(&self) -> SignatureFormat {
        SignatureFormat::Der
    }

    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        let signature: p256::ecdsa::Signature = self.0.try_sign(message)?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

/// Ed25519 signer standing in for a remote signing service
#[derive(Debug)]
pub struct RemoteEd25519Signer(pub ed25519_dalek::SigningKey);

impl OpaqueSigner for RemoteEd25519Signer {
    fn public_key(&self) -> PublicKey {
        PublicKey::Ed25519(self.0.verifying_key())
    }

    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        let signature: ed25519_dalek::Signature = self.0.try_sign(message)?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// Signer whose device is unavailable
#[derive(Debug)]
pub struct BrokenSigner(pub PublicKey);

impl OpaqueSigner for BrokenSigner {
    fn public_key(&self) -> PublicKey {
        self.0.clone()
    }

    fn sign(&self, _message: &[u8]) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("device not present")
    }
}

fn segment(token: &str, index: usize) -> Value {
    let part = token.split('.').nth(index).unwrap();
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).unwrap()).unwrap()
}

/// Decoded protected header
pub fn header_of(token: &str) -> Value {
    segment(token, 0)
}

/// Decoded payload
pub fn payload_of(token: &str) -> Value {
    segment(token, 1)
}

/// Replace the character in the middle of the signature segment with a
/// different base64url character
pub fn tamper_signature(token: &str) -> String {
    let signature_start = token.rfind('.').unwrap() + 1;
    let index = signature_start + (token.len() - signature_start) / 2;
    let original = token.as_bytes()[index];
    let replacement = if original == b'A' { 'B' } else { 'A' };
    let mut tampered = token.to_string();
    tampered.replace_range(index..=index, &replacement.to_string());
    tampered
}
