//! Claim sets carried by issued tokens.
//!
//! Every profile owns a claim shape. [`TokenClaims`] is the closed set of
//! shapes the signer accepts; the `Extended` variant carries a free-form map
//! for the workload-identity profile, whose callers may attach private claims.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::timestamp::NumericDate;
use crate::{JwtError, Result};

/// Registered claim names from RFC 7519 section 4.1
pub const REGISTERED_CLAIM_NAMES: [&str; 7] = ["iss", "sub", "aud", "exp", "nbf", "iat", "jti"];

/// The `aud` claim.
///
/// A single recipient is encoded as a string, several as an array. Both
/// encodings decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience(pub Vec<String>);

impl Audience {
    /// Audience with one recipient
    pub fn single(audience: impl Into<String>) -> Self {
        Self(vec![audience.into()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `audience` is one of the recipients
    pub fn contains(&self, audience: &str) -> bool {
        self.0.iter().any(|a| a == audience)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for Audience {
    fn from(audience: Vec<String>) -> Self {
        Self(audience)
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(audience) => Self(vec![audience]),
            Raw::Many(audience) => Self(audience),
        })
    }
}

/// RFC 7519 registered claims. Empty values are omitted when encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    #[serde(rename = "iss", default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(rename = "sub", default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(rename = "aud", default, skip_serializing_if = "Audience::is_empty")]
    pub audience: Audience,
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<NumericDate>,
    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<NumericDate>,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<NumericDate>,
    #[serde(rename = "jti", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

/// Identity token claims: registered claims plus the caller's identity,
/// roles and traits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub registered: RegisteredClaims,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub traits: BTreeMap<String, Vec<String>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Cloud-IAM federation claims: registered claims plus the delegating user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsOidcClaims {
    #[serde(flatten)]
    pub registered: RegisteredClaims,
    /// `user:<identity>` of the user on whose behalf the token was minted
    #[serde(rename = "obo", default, skip_serializing_if = "String::is_empty")]
    pub on_behalf_of: String,
}

/// Minimal claims of an Azure access token handed to the az CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureTokenClaims {
    #[serde(rename = "tid")]
    pub tenant_id: String,
    pub resource: String,
}

/// The claim shapes the signer accepts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenClaims {
    /// Identity and proxy-header tokens
    Identity(Claims),
    /// Cloud-IAM federation tokens
    AwsOidc(AwsOidcClaims),
    /// Directory-federation, data-warehouse and plugin tokens
    Registered(RegisteredClaims),
    /// Registered claims merged with caller-supplied private claims
    Extended(Map<String, Value>),
    /// Azure access tokens
    AzureToken(AzureTokenClaims),
}

impl TokenClaims {
    /// Profile label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identity(_) => "identity",
            Self::AwsOidc(_) => "aws_oidc",
            Self::Registered(_) => "registered",
            Self::Extended(_) => "extended",
            Self::AzureToken(_) => "azure_token",
        }
    }
}

/// Merge `private` claims into the encoded `registered` claims.
///
/// A private claim is dropped when its name is a registered claim name or is
/// already present. Existing values are never overwritten.
///
/// # Errors
///
/// Returns [`JwtError::BadParameter`] if the registered claims do not encode
/// to a JSON object.
pub fn merge_private_claims(
    registered: &RegisteredClaims,
    private: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let encoded = serde_json::to_value(registered)
        .map_err(|e| JwtError::bad_parameter(format!("marshaling claims: {e}")))?;
    let Value::Object(mut merged) = encoded else {
        return Err(JwtError::bad_parameter("registered claims are not an object"));
    };
    for (name, value) in private {
        if REGISTERED_CLAIM_NAMES.contains(&name.as_str()) || merged.contains_key(name) {
            tracing::trace!(claim = %name, "dropping private claim that collides with a registered claim");
            continue;
        }
        merged.insert(name.clone(), value.clone());
    }
    Ok(merged)
}
