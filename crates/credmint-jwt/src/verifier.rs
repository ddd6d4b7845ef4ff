//! Signature verification and the expected-claims predicate.
//!
//! Every failure past parsing collapses into [`JwtError::InvalidToken`]. The
//! internal reason is only emitted at trace level.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde_json::Value;

use crate::algorithm::SigningAlgorithm;
use crate::claims::RegisteredClaims;
use crate::keys::{JwkComponents, PublicKey};
use crate::{JwtError, Result};

/// Claims a verified token must carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    /// Exact `iss`, unchecked when `None`
    pub issuer: Option<String>,
    /// Exact `sub`, unchecked when `None`
    pub subject: Option<String>,
    /// Every listed audience must appear in `aud`
    pub audience: Vec<String>,
    /// Instant the time claims are checked against
    pub time: DateTime<Utc>,
}

impl Expected {
    /// Expectations that only check the time claims
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            issuer: None,
            subject: None,
            audience: Vec::new(),
            time,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: Vec<String>) -> Self {
        self.audience = audience;
        self
    }

    /// Check `claims` against these expectations, allowing `leeway` of
    /// clock drift on the time claims.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::InvalidToken`] on the first mismatch.
    pub fn validate(&self, claims: &RegisteredClaims, leeway: Duration) -> Result<()> {
        let reject = |reason: &str| {
            tracing::trace!(reason, "token claims rejected");
            Err(JwtError::InvalidToken)
        };

        if self.issuer.as_ref().is_some_and(|iss| *iss != claims.issuer) {
            return reject("issuer mismatch");
        }
        if self.subject.as_ref().is_some_and(|sub| *sub != claims.subject) {
            return reject("subject mismatch");
        }
        if !self.audience.iter().all(|aud| claims.audience.contains(aud)) {
            return reject("audience mismatch");
        }
        let (Some(latest), Some(earliest)) = (
            self.time.checked_add_signed(leeway),
            self.time.checked_sub_signed(leeway),
        ) else {
            return reject("leeway out of range");
        };
        if claims.not_before.is_some_and(|nbf| latest < nbf.to_datetime()) {
            return reject("token not valid yet");
        }
        if claims.expiry.is_some_and(|exp| earliest > exp.to_datetime()) {
            return reject("token expired");
        }
        if claims.issued_at.is_some_and(|iat| latest < iat.to_datetime()) {
            return reject("token issued in the future");
        }
        Ok(())
    }
}

fn decoding_key(key: &PublicKey) -> Result<DecodingKey> {
    let decoded = match key.jwk_components()? {
        JwkComponents::Rsa { n, e } => DecodingKey::from_rsa_components(&n, &e),
        JwkComponents::Ec { x, y } => DecodingKey::from_ec_components(&x, &y),
        JwkComponents::Okp { x } => DecodingKey::from_ed_components(&x),
    };
    decoded.map_err(|e| JwtError::bad_parameter(format!("cannot use public key: {e}")))
}

/// Check the signature of `raw` and return its decoded claim set.
///
/// Registered time claims are not checked here; [`Expected::validate`] owns
/// them. The header `alg` must equal `algorithm`.
///
/// # Errors
///
/// Returns [`JwtError::InvalidToken`] when the signature does not verify and
/// the key error when `key` cannot be used for verification.
pub fn verify_signature(
    raw: &str,
    key: &PublicKey,
    algorithm: SigningAlgorithm,
) -> Result<serde_json::Map<String, Value>> {
    let decoding_key = decoding_key(key)?;

    let mut validation = Validation::new(algorithm.to_jwt());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation.leeway = 0;

    match decode::<Value>(raw, &decoding_key, &validation) {
        Ok(data) => match data.claims {
            Value::Object(claims) => Ok(claims),
            _ => Err(JwtError::InvalidToken),
        },
        Err(e) => {
            tracing::trace!(error = %e, "token signature rejected");
            Err(JwtError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Audience;
    use crate::timestamp::NumericDate;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    fn claims() -> RegisteredClaims {
        RegisteredClaims {
            issuer: "cluster".into(),
            subject: "alice".into(),
            audience: Audience(vec!["a".into(), "b".into()]),
            expiry: NumericDate::from_seconds(2_000),
            not_before: NumericDate::from_seconds(990),
            issued_at: NumericDate::from_seconds(1_000),
            id: String::new(),
        }
    }

    #[test]
    fn test_matching_claims_pass() {
        let expected = Expected::at(at(1_000))
            .with_issuer("cluster")
            .with_subject("alice")
            .with_audience(vec!["b".into()]);
        assert!(expected.validate(&claims(), Duration::zero()).is_ok());
    }

    #[test]
    fn test_mismatches_are_indistinguishable() {
        let cases = [
            Expected::at(at(1_000)).with_issuer("other"),
            Expected::at(at(1_000)).with_subject("bob"),
            Expected::at(at(1_000)).with_audience(vec!["a".into(), "c".into()]),
            Expected::at(at(2_001)),
            Expected::at(at(989)),
        ];
        for expected in cases {
            assert_eq!(
                expected.validate(&claims(), Duration::zero()),
                Err(JwtError::InvalidToken)
            );
        }
    }

    #[test]
    fn test_expiry_boundary_and_leeway() {
        assert!(Expected::at(at(2_000)).validate(&claims(), Duration::zero()).is_ok());
        assert!(
            Expected::at(at(2_030))
                .validate(&claims(), Duration::seconds(30))
                .is_ok()
        );
        assert!(
            Expected::at(at(2_031))
                .validate(&claims(), Duration::seconds(30))
                .is_err()
        );
    }

    #[test]
    fn test_issued_in_future_rejected() {
        let mut future = claims();
        future.not_before = None;
        future.issued_at = NumericDate::from_seconds(1_500);
        assert!(Expected::at(at(1_000)).validate(&future, Duration::zero()).is_err());
    }

    #[test]
    fn test_unrepresentable_leeway_is_invalid_not_a_panic() {
        let expected = Expected::at(at(1_000));
        assert_eq!(
            expected.validate(&claims(), Duration::MAX),
            Err(JwtError::InvalidToken)
        );
        assert_eq!(
            Expected::at(DateTime::<Utc>::MAX_UTC).validate(&claims(), Duration::seconds(1)),
            Err(JwtError::InvalidToken)
        );
    }

    #[test]
    fn test_unsupported_key_cannot_verify() {
        let key = PublicKey::Other {
            algorithm: "1.3.101.111".into(),
            der: vec![],
        };
        let err = verify_signature("a.b.c", &key, SigningAlgorithm::EdDSA).unwrap_err();
        assert!(matches!(err, JwtError::UnsupportedKeyType { .. }));
    }
}
