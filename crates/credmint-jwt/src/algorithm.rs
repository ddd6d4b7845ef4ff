//! Signature algorithm selection

use std::fmt;

use jsonwebtoken::Algorithm;

use crate::keys::PublicKey;
use crate::{JwtError, Result};

/// Signature algorithms this engine produces and accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256
    RS256,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// Ed25519
    EdDSA,
}

impl SigningAlgorithm {
    /// JWS `alg` header value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::ES256 => "ES256",
            Self::EdDSA => "EdDSA",
        }
    }

    /// The matching `jsonwebtoken` algorithm
    pub fn to_jwt(&self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::ES256 => Algorithm::ES256,
            Self::EdDSA => Algorithm::EdDSA,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm mandated for the family of `key`.
///
/// # Errors
///
/// Returns [`JwtError::UnsupportedKeyType`] for keys outside RSA, P-256 and
/// Ed25519.
pub fn algorithm_for_public_key(key: &PublicKey) -> Result<SigningAlgorithm> {
    match key {
        PublicKey::Rsa(_) => Ok(SigningAlgorithm::RS256),
        PublicKey::EcdsaP256(_) => Ok(SigningAlgorithm::ES256),
        PublicKey::Ed25519(_) => Ok(SigningAlgorithm::EdDSA),
        PublicKey::Other { algorithm, .. } => Err(JwtError::UnsupportedKeyType {
            reason: format!("unsupported public key type {algorithm}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_algorithm_per_family() {
        let ec = p256::ecdsa::SigningKey::random(&mut OsRng);
        let ed = ed25519_dalek::SigningKey::generate(&mut OsRng);

        assert_eq!(
            algorithm_for_public_key(&PublicKey::EcdsaP256(*ec.verifying_key())).unwrap(),
            SigningAlgorithm::ES256
        );
        assert_eq!(
            algorithm_for_public_key(&PublicKey::Ed25519(ed.verifying_key())).unwrap(),
            SigningAlgorithm::EdDSA
        );
    }

    #[test]
    fn test_other_family_is_unsupported() {
        let key = PublicKey::Other {
            algorithm: "1.3.101.111".to_string(),
            der: vec![],
        };
        let err = algorithm_for_public_key(&key).unwrap_err();
        assert!(matches!(err, JwtError::UnsupportedKeyType { .. }));
        assert!(err.to_string().contains("unsupported public key type"));
    }

    #[test]
    fn test_header_names() {
        assert_eq!(SigningAlgorithm::RS256.as_str(), "RS256");
        assert_eq!(SigningAlgorithm::ES256.to_jwt(), Algorithm::ES256);
        assert_eq!(SigningAlgorithm::EdDSA.to_string(), "EdDSA");
    }
}
