//! Compact token parsing without trust.
//!
//! Parsing checks structure only. Nothing returned here has been verified.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Header, decode_header};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{JwtError, Result};

/// A structurally valid compact JWS whose signature has not been checked
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    header: Header,
    claims: Map<String, Value>,
}

impl UnverifiedToken {
    /// Split and decode `header.payload.signature`.
    ///
    /// The signature segment is not decoded here; verification owns it.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::MalformedToken`] when the token does not have three
    /// segments, the header is not a JOSE header, or the payload is not a JSON
    /// object.
    pub fn parse(raw: &str) -> Result<Self> {
        let segments: Vec<&str> = raw.split('.').collect();
        let [_, payload, signature] = segments.as_slice() else {
            return Err(JwtError::malformed(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };
        if signature.is_empty() {
            return Err(JwtError::malformed("signature segment is empty"));
        }

        let header =
            decode_header(raw).map_err(|e| JwtError::malformed(format!("invalid header: {e}")))?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| JwtError::malformed(format!("invalid payload encoding: {e}")))?;
        let claims = match serde_json::from_slice(&payload) {
            Ok(Value::Object(claims)) => claims,
            Ok(_) => return Err(JwtError::malformed("payload is not a JSON object")),
            Err(e) => return Err(JwtError::malformed(format!("invalid payload: {e}"))),
        };

        Ok(Self { header, claims })
    }

    /// Decoded protected header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// `kid` header, if any
    pub fn key_id(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }

    /// Raw claim set
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Decode the claim set into `T`
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::MalformedToken`] when the claims do not fit `T`.
    pub fn decode_claims<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.claims.clone()))
            .map_err(|e| JwtError::malformed(format!("cannot decode claims: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_parses_structure() {
        let raw = format!(
            "{}.{}.c2ln",
            encode(&json!({"alg": "ES256", "typ": "JWT", "kid": "k1"})),
            encode(&json!({"sub": "alice", "nbf": 1_700_000_000}))
        );
        let token = UnverifiedToken::parse(&raw).unwrap();
        assert_eq!(token.key_id(), Some("k1"));
        assert_eq!(token.claims()["sub"], json!("alice"));
    }

    #[test]
    fn test_rejects_wrong_segment_count() {
        for raw in ["", "a.b", "a.b.c.d"] {
            let err = UnverifiedToken::parse(raw).unwrap_err();
            assert!(matches!(err, JwtError::MalformedToken { .. }), "{raw}");
        }
    }

    #[test]
    fn test_rejects_non_object_payload() {
        let raw = format!(
            "{}.{}.c2ln",
            encode(&json!({"alg": "ES256"})),
            encode(&json!(["not", "claims"]))
        );
        assert!(matches!(
            UnverifiedToken::parse(&raw),
            Err(JwtError::MalformedToken { .. })
        ));
    }

    #[test]
    fn test_rejects_garbage_header() {
        let raw = format!("bm90LWpzb24.{}.c2ln", encode(&json!({})));
        assert!(matches!(
            UnverifiedToken::parse(&raw),
            Err(JwtError::MalformedToken { .. })
        ));
    }
}
