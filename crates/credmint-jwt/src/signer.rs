//! JWS compact serialization and signing

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::Header;
use serde::Serialize;
use sha2::Sha256;
use signature::{SignatureEncoding, Signer as _};

use crate::algorithm::{SigningAlgorithm, algorithm_for_public_key};
use crate::keys::{OpaqueSigner, PrivateKey, SignatureFormat};
use crate::{JWT_TYPE, JwtError, Result};

/// Options for the protected header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderOptions {
    /// `kid` header. `None` omits the header, `Some("")` sets it to an empty
    /// string.
    pub key_id: Option<String>,
}

impl HeaderOptions {
    /// Header with a `kid`
    pub fn with_key_id(key_id: impl Into<String>) -> Self {
        Self {
            key_id: Some(key_id.into()),
        }
    }
}

/// Prepared signing key for each supported family
#[derive(Clone)]
enum SigningBackend {
    Rsa(rsa::pkcs1v15::SigningKey<Sha256>),
    EcdsaP256(p256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
    Opaque(Arc<dyn OpaqueSigner>),
}

impl SigningBackend {
    fn kind(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "rsa",
            Self::EcdsaP256(_) => "ecdsa-p256",
            Self::Ed25519(_) => "ed25519",
            Self::Opaque(_) => "opaque",
        }
    }
}

/// A private key bound to the algorithm its family mandates
#[derive(Clone)]
pub struct Signer {
    backend: SigningBackend,
    algorithm: SigningAlgorithm,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("kind", &self.backend.kind())
            .field("algorithm", &self.algorithm)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Signer {
    /// Bind `key` to its algorithm
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::UnsupportedKeyType`] when the public half of the
    /// key is outside RSA, P-256 and Ed25519.
    pub fn new(key: PrivateKey) -> Result<Self> {
        let algorithm = algorithm_for_public_key(&key.public_key())?;
        let backend = match key {
            PrivateKey::Rsa(key) => SigningBackend::Rsa(rsa::pkcs1v15::SigningKey::new(key)),
            PrivateKey::EcdsaP256(key) => SigningBackend::EcdsaP256(key),
            PrivateKey::Ed25519(key) => SigningBackend::Ed25519(key),
            PrivateKey::Opaque(signer) => SigningBackend::Opaque(signer),
        };
        Ok(Self { backend, algorithm })
    }

    /// Algorithm written into the `alg` header
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Serialize `claims` as the payload and sign it
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] if the claims cannot be encoded and
    /// [`JwtError::SigningFailed`] if the signature cannot be produced.
    pub fn sign<T: Serialize>(&self, claims: &T, options: &HeaderOptions) -> Result<String> {
        let payload = serde_json::to_vec(claims)
            .map_err(|e| JwtError::bad_parameter(format!("cannot encode claims: {e}")))?;
        self.sign_payload(&payload, options)
    }

    /// Sign an arbitrary payload as a compact JWS
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::SigningFailed`] if the signature cannot be produced.
    pub fn sign_payload(&self, payload: &[u8], options: &HeaderOptions) -> Result<String> {
        let mut header = Header::new(self.algorithm.to_jwt());
        header.typ = Some(JWT_TYPE.to_string());
        header.kid.clone_from(&options.key_id);
        let header = serde_json::to_vec(&header)
            .map_err(|e| JwtError::bad_parameter(format!("cannot encode header: {e}")))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.sign_bytes(signing_input.as_bytes())?;
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    fn sign_bytes(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signed = match &self.backend {
            SigningBackend::Rsa(key) => key
                .try_sign(message)
                .map(|signature| signature.to_vec()),
            SigningBackend::EcdsaP256(key) => key
                .try_sign(message)
                .map(|signature: p256::ecdsa::Signature| signature.to_bytes().to_vec()),
            SigningBackend::Ed25519(key) => key
                .try_sign(message)
                .map(|signature: ed25519_dalek::Signature| signature.to_bytes().to_vec()),
            SigningBackend::Opaque(signer) => {
                let raw = signer.sign(message).map_err(|e| JwtError::SigningFailed {
                    reason: format!("opaque signer: {e:#}"),
                })?;
                return self.normalize_opaque(raw, signer.signature_format());
            }
        };
        signed.map_err(|e| JwtError::SigningFailed {
            reason: e.to_string(),
        })
    }

    /// JWS wants ECDSA signatures as fixed-width `r||s`.
    fn normalize_opaque(&self, raw: Vec<u8>, format: SignatureFormat) -> Result<Vec<u8>> {
        match (format, self.algorithm) {
            (SignatureFormat::Jws, SigningAlgorithm::ES256) if raw.len() != 64 => {
                Err(JwtError::SigningFailed {
                    reason: format!(
                        "opaque signer returned {} bytes, ES256 needs 64",
                        raw.len()
                    ),
                })
            }
            (SignatureFormat::Jws, _) => Ok(raw),
            (SignatureFormat::Der, SigningAlgorithm::ES256) => {
                tracing::trace!(len = raw.len(), "converting DER ECDSA signature to r||s");
                p256::ecdsa::Signature::from_der(&raw)
                    .map(|signature| signature.to_bytes().to_vec())
                    .map_err(|e| JwtError::SigningFailed {
                        reason: format!("opaque signer returned an invalid ECDSA signature: {e}"),
                    })
            }
            (SignatureFormat::Der, algorithm) => Err(JwtError::SigningFailed {
                reason: format!("DER signatures are not defined for {algorithm}"),
            }),
        }
    }
}
