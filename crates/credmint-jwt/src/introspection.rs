//! Not-before checks for externally issued tokens

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::timestamp::NumericDate;
use crate::token::UnverifiedToken;
use crate::{JwtError, Result};

/// A token whose claims can be decoded, such as an OpenID Connect ID token
/// produced by another library
pub trait IdToken {
    /// Decode the token payload into `T`
    ///
    /// # Errors
    ///
    /// Any failure to decode the payload into `T`.
    fn decode_claims<T: DeserializeOwned>(&self) -> Result<T>;
}

impl IdToken for UnverifiedToken {
    fn decode_claims<T: DeserializeOwned>(&self) -> Result<T> {
        UnverifiedToken::decode_claims(self)
    }
}

#[derive(Deserialize)]
struct NotBefore {
    #[serde(default)]
    nbf: Option<Value>,
}

/// Reject `token` when its `nbf` claim is still in the future at
/// `now + leeway`. A token without `nbf` passes.
///
/// # Errors
///
/// Returns [`JwtError::AccessDenied`] when the token is not valid yet,
/// [`JwtError::BadParameter`] when `now + leeway` is not representable, and
/// the decoding error when `nbf` is present but not numeric.
pub fn check_not_before<T: IdToken>(now: DateTime<Utc>, leeway: Duration, token: &T) -> Result<()> {
    let claims: NotBefore = token.decode_claims()?;
    let Some(nbf) = claims.nbf.filter(|value| !value.is_null()) else {
        return Ok(());
    };
    let not_before = NumericDate::from_json(&nbf)?;
    let latest = now
        .checked_add_signed(leeway)
        .ok_or_else(|| JwtError::bad_parameter("leeway out of range"))?;
    if latest < not_before.to_datetime() {
        return Err(JwtError::AccessDenied {
            reason: "token not before in future".to_string(),
        });
    }
    Ok(())
}
