//! Key identifiers for the `kid` header

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::keys::{JwkComponents, PublicKey};
use crate::{JwtError, Result};

/// Computes a deterministic short identifier for a public key
pub trait KeyIdentifier: Send + Sync {
    /// Identifier for `key`
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::KeyIdUnavailable`] when no identifier can be
    /// computed for the key.
    fn key_id(&self, key: &PublicKey) -> Result<String>;
}

impl<F> KeyIdentifier for F
where
    F: Fn(&PublicKey) -> Result<String> + Send + Sync,
{
    fn key_id(&self, key: &PublicKey) -> Result<String> {
        self(key)
    }
}

/// JWK thumbprint as defined in RFC 7638
#[derive(Debug, Clone, Copy, Default)]
pub struct JwkThumbprint;

impl KeyIdentifier for JwkThumbprint {
    fn key_id(&self, key: &PublicKey) -> Result<String> {
        compute_jwk_thumbprint(key)
    }
}

/// Compute the RFC 7638 thumbprint of `key`
///
/// # Errors
///
/// Returns [`JwtError::KeyIdUnavailable`] for keys without a JWK form.
pub fn compute_jwk_thumbprint(key: &PublicKey) -> Result<String> {
    let components = key
        .jwk_components()
        .map_err(|e| JwtError::KeyIdUnavailable {
            reason: e.to_string(),
        })?;

    // Required members only, in lexicographic order, no whitespace
    let canonical_json = match components {
        JwkComponents::Rsa { n, e } => format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#),
        JwkComponents::Ec { x, y } => {
            format!(r#"{{"crv":"P-256","kty":"EC","x":"{x}","y":"{y}"}}"#)
        }
        JwkComponents::Okp { x } => format!(r#"{{"crv":"Ed25519","kty":"OKP","x":"{x}"}}"#),
    };

    let hash = Sha256::digest(canonical_json.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7638_example_thumbprint() {
        // Key from RFC 7638 section 3.1
        let n = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";
        let modulus = rsa::BigUint::from_bytes_be(&URL_SAFE_NO_PAD.decode(n).unwrap());
        let exponent = rsa::BigUint::from(65_537u32);
        let key = PublicKey::Rsa(rsa::RsaPublicKey::new(modulus, exponent).unwrap());

        assert_eq!(
            JwkThumbprint.key_id(&key).unwrap(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }

    #[test]
    fn test_unsupported_key_has_no_thumbprint() {
        let key = PublicKey::Other {
            algorithm: "1.3.101.111".to_string(),
            der: vec![],
        };
        assert!(matches!(
            JwkThumbprint.key_id(&key),
            Err(JwtError::KeyIdUnavailable { .. })
        ));
    }

    #[test]
    fn test_closure_identifier() {
        let fixed = |_: &PublicKey| -> Result<String> { Ok("static-kid".to_string()) };
        let key = PublicKey::Other {
            algorithm: "1.3.101.111".to_string(),
            der: vec![],
        };
        assert_eq!(fixed.key_id(&key).unwrap(), "static-kid");
    }
}
