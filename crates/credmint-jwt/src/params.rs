//! Request parameters for every sign and verify operation.
//!
//! Each struct exposes `check()`, which rejects incomplete input with
//! [`JwtError::BadParameter`] before any cryptographic work happens.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use spiffe::SpiffeId;

use crate::{JwtError, Result};

fn require(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(JwtError::bad_parameter(format!("{what} missing")));
    }
    Ok(())
}

fn require_expires(expires: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
    expires.ok_or_else(|| JwtError::bad_parameter("expires missing"))
}

fn require_audiences(audiences: &[String]) -> Result<()> {
    if audiences.is_empty() {
        return Err(JwtError::bad_parameter("audience missing"));
    }
    if audiences.iter().any(String::is_empty) {
        return Err(JwtError::bad_parameter("audience contains an empty value"));
    }
    Ok(())
}

/// Parameters of an identity token
#[derive(Debug, Clone, Default)]
pub struct IdentitySignParams {
    /// Identity of the caller, used as subject and `username`
    pub username: String,
    /// Roles assigned to the caller
    pub roles: Vec<String>,
    /// Traits assigned to the caller
    pub traits: BTreeMap<String, Vec<String>>,
    /// Expiry of the token
    pub expires: Option<DateTime<Utc>>,
    /// URI of the recipient application
    pub uri: String,
}

impl IdentitySignParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when username, expiry or URI is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.username, "username")?;
        require_expires(self.expires)?;
        require(&self.uri, "uri")
    }
}

/// Parameters of a cloud-IAM federation token
#[derive(Debug, Clone, Default)]
pub struct AwsOidcSignParams {
    /// User on whose behalf the token is minted
    pub username: String,
    pub issuer: String,
    pub subject: String,
    pub audience: String,
    pub expires: Option<DateTime<Utc>>,
}

impl AwsOidcSignParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when any field is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.username, "username")?;
        require(&self.issuer, "issuer")?;
        require(&self.subject, "subject")?;
        require(&self.audience, "audience")?;
        require_expires(self.expires).map(|_| ())
    }
}

/// Parameters of a workload-identity (JWT-SVID) token
#[derive(Debug, Clone)]
pub struct JwtSvidSignParams {
    /// Unique token identifier
    pub jti: String,
    /// Workload the token is issued to
    pub spiffe_id: SpiffeId,
    /// Intended recipients, at least one
    pub audiences: Vec<String>,
    /// Lifetime measured from signing time
    pub ttl: Duration,
    /// `iss` claim, omitted when empty
    pub issuer: String,
    /// Overrides the expiry computed from `ttl`
    pub set_expiry: Option<DateTime<Utc>>,
    /// Overrides the issued-at time
    pub set_issued_at: Option<DateTime<Utc>>,
    /// Additional claims, dropped when they collide with a registered claim
    pub private_claims: Map<String, Value>,
}

impl JwtSvidSignParams {
    /// Parameters with the required fields set and nothing overridden
    pub fn new(spiffe_id: SpiffeId, audiences: Vec<String>, ttl: Duration) -> Self {
        Self {
            jti: String::new(),
            spiffe_id,
            audiences,
            ttl,
            issuer: String::new(),
            set_expiry: None,
            set_issued_at: None,
            private_claims: Map::new(),
        }
    }

    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when there is no audience or the lifetime is
    /// not positive and no explicit expiry is given.
    pub fn check(&self) -> Result<()> {
        require_audiences(&self.audiences)?;
        if self.set_expiry.is_none() && self.ttl <= Duration::zero() {
            return Err(JwtError::bad_parameter("ttl must be positive"));
        }
        Ok(())
    }
}

/// Parameters of a directory-federation token
#[derive(Debug, Clone, Default)]
pub struct EntraOidcSignParams {
    pub issuer: String,
    pub subject: String,
    pub audience: String,
    pub expires: Option<DateTime<Utc>>,
}

impl EntraOidcSignParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when any field is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.issuer, "issuer")?;
        require(&self.subject, "subject")?;
        require(&self.audience, "audience")?;
        require_expires(self.expires).map(|_| ())
    }
}

/// Parameters of a data-warehouse token
#[derive(Debug, Clone, Default)]
pub struct SnowflakeSignParams {
    /// Caller identity, used as subject
    pub username: String,
    /// Vendor-formatted issuer, see [`crate::snowflake_issuer`]
    pub issuer: String,
    pub expires: Option<DateTime<Utc>>,
}

impl SnowflakeSignParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when any field is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.username, "username")?;
        require(&self.issuer, "issuer")?;
        require_expires(self.expires).map(|_| ())
    }
}

/// Parameters of a plugin token, shared by signing and verification
#[derive(Debug, Clone, Default)]
pub struct PluginTokenParams {
    pub audience: Vec<String>,
    pub issuer: String,
    pub subject: String,
    pub expires: Option<DateTime<Utc>>,
}

impl PluginTokenParams {
    /// Checks required for signing
    ///
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when any field is missing.
    pub fn check(&self) -> Result<()> {
        self.check_expected()?;
        require_expires(self.expires).map(|_| ())
    }

    /// Checks required for verification, which ignores the expiry field
    ///
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when issuer, subject or audience is missing.
    pub fn check_expected(&self) -> Result<()> {
        require(&self.issuer, "issuer")?;
        require(&self.subject, "subject")?;
        require_audiences(&self.audience)
    }
}

/// Parameters of a proxy-header token
#[derive(Debug, Clone, Default)]
pub struct ProxySignParams {
    pub cluster_name: String,
    pub source_address: String,
    pub destination_address: String,
}

impl ProxySignParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when any field is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.cluster_name, "cluster name")?;
        require(&self.source_address, "source address")?;
        require(&self.destination_address, "destination address")
    }
}

/// Parameters for verifying an identity token
#[derive(Clone, Default)]
pub struct VerifyParams {
    pub username: String,
    pub raw_token: String,
    pub uri: String,
}

impl VerifyParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when username, token or URI is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.username, "username")?;
        require(&self.raw_token, "raw token")?;
        require(&self.uri, "uri")
    }
}

impl fmt::Debug for VerifyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyParams")
            .field("username", &self.username)
            .field("raw_token", &"<redacted>")
            .field("uri", &self.uri)
            .finish()
    }
}

/// Parameters for verifying a cloud-IAM federation token
#[derive(Clone, Default)]
pub struct AwsOidcVerifyParams {
    pub raw_token: String,
    pub issuer: String,
}

impl AwsOidcVerifyParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when token or issuer is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.raw_token, "raw token")?;
        require(&self.issuer, "issuer")
    }
}

impl fmt::Debug for AwsOidcVerifyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsOidcVerifyParams")
            .field("raw_token", &"<redacted>")
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Parameters for verifying a data-warehouse token
#[derive(Clone, Default)]
pub struct SnowflakeVerifyParams {
    pub account_name: String,
    pub login_name: String,
    pub raw_token: String,
}

impl SnowflakeVerifyParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when any field is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.account_name, "account name")?;
        require(&self.login_name, "login name")?;
        require(&self.raw_token, "raw token")
    }
}

impl fmt::Debug for SnowflakeVerifyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeVerifyParams")
            .field("account_name", &self.account_name)
            .field("login_name", &self.login_name)
            .field("raw_token", &"<redacted>")
            .finish()
    }
}

/// Parameters for verifying a proxy-header token
#[derive(Clone, Default)]
pub struct ProxyVerifyParams {
    pub cluster_name: String,
    pub source_address: String,
    pub destination_address: String,
    pub raw_token: String,
}

impl ProxyVerifyParams {
    /// # Errors
    ///
    /// [`JwtError::BadParameter`] when any field is missing.
    pub fn check(&self) -> Result<()> {
        require(&self.cluster_name, "cluster name")?;
        require(&self.source_address, "source address")?;
        require(&self.destination_address, "destination address")?;
        require(&self.raw_token, "raw token")
    }
}

impl fmt::Debug for ProxyVerifyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyVerifyParams")
            .field("cluster_name", &self.cluster_name)
            .field("source_address", &self.source_address)
            .field("destination_address", &self.destination_address)
            .field("raw_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expires() -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(1_700_000_000, 0)
    }

    #[test]
    fn test_identity_params_report_first_missing_field() {
        let mut params = IdentitySignParams::default();
        assert_eq!(
            params.check().unwrap_err().to_string(),
            "Bad parameter: username missing"
        );

        params.username = "alice".into();
        assert_eq!(
            params.check().unwrap_err().to_string(),
            "Bad parameter: expires missing"
        );

        params.expires = expires();
        assert_eq!(
            params.check().unwrap_err().to_string(),
            "Bad parameter: uri missing"
        );

        params.uri = "https://app.example.com".into();
        assert!(params.check().is_ok());
    }

    #[test]
    fn test_verify_params_require_token() {
        let params = VerifyParams {
            username: "alice".into(),
            raw_token: String::new(),
            uri: "https://app".into(),
        };
        assert_eq!(
            params.check().unwrap_err().to_string(),
            "Bad parameter: raw token missing"
        );
    }

    #[test]
    fn test_jwt_svid_params() {
        let id = SpiffeId::new("spiffe://example.org/web").unwrap();
        let mut params = JwtSvidSignParams::new(id, vec![], Duration::minutes(5));
        assert!(params.check().unwrap_err().is_bad_parameter());

        params.audiences = vec!["aud".into()];
        assert!(params.check().is_ok());

        params.ttl = Duration::zero();
        assert!(params.check().is_err());

        params.set_expiry = expires();
        assert!(params.check().is_ok());
    }

    #[test]
    fn test_plugin_params_expected_ignores_expiry() {
        let params = PluginTokenParams {
            audience: vec!["plugin".into()],
            issuer: "cluster".into(),
            subject: "slack".into(),
            expires: None,
        };
        assert!(params.check_expected().is_ok());
        assert_eq!(
            params.check().unwrap_err().to_string(),
            "Bad parameter: expires missing"
        );
    }

    #[test]
    fn test_snowflake_and_proxy_verify_params() {
        let snowflake = SnowflakeVerifyParams {
            account_name: "acct".into(),
            login_name: String::new(),
            raw_token: "t".into(),
        };
        assert_eq!(
            snowflake.check().unwrap_err().to_string(),
            "Bad parameter: login name missing"
        );

        let proxy = ProxyVerifyParams {
            cluster_name: "cluster".into(),
            ..Default::default()
        };
        assert_eq!(
            proxy.check().unwrap_err().to_string(),
            "Bad parameter: source address missing"
        );
    }

    #[test]
    fn test_debug_redacts_raw_token() {
        let params = AwsOidcVerifyParams {
            raw_token: "eyJhbGciOi.secret.sig".into(),
            issuer: "https://issuer".into(),
        };
        let debug = format!("{params:?}");
        assert!(!debug.contains("secret"));
    }
}
