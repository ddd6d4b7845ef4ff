//! Per-consumer claim profiles.
//!
//! Every profile validates its parameters first, builds its own claim shape
//! and chooses its `kid` policy:
//!
//! | Profile            | `kid`                              |
//! |--------------------|------------------------------------|
//! | identity, plugin   | attached when computable           |
//! | cloud-IAM (AWS)    | always present, empty string       |
//! | JWT-SVID, Entra ID | required, failure aborts signing   |
//! | Snowflake, proxy   | never attached                     |

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Duration;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::claims::{
    Audience, AwsOidcClaims, AzureTokenClaims, Claims, RegisteredClaims, TokenClaims,
    merge_private_claims,
};
use crate::key::JwtKey;
use crate::keys::PublicKey;
use crate::params::{
    AwsOidcSignParams, AwsOidcVerifyParams, EntraOidcSignParams, IdentitySignParams,
    JwtSvidSignParams, PluginTokenParams, ProxySignParams, ProxyVerifyParams, SnowflakeSignParams,
    SnowflakeVerifyParams, VerifyParams,
};
use crate::signer::HeaderOptions;
use crate::timestamp::NumericDate;
use crate::verifier::Expected;
use crate::{
    AWS_OIDC_AUDIENCE, AWS_OIDC_SUBJECT, JwtError, NOT_BEFORE_SKEW_SECONDS,
    PROXY_TOKEN_LIFETIME_SECONDS, Result,
};

fn skew() -> Duration {
    Duration::seconds(NOT_BEFORE_SKEW_SECONDS)
}

fn date(time: chrono::DateTime<chrono::Utc>) -> Option<NumericDate> {
    Some(NumericDate::from(time))
}

/// Base64 (standard alphabet) SHA-256 of the SubjectPublicKeyInfo DER
///
/// # Errors
///
/// Returns [`JwtError::BadParameter`] if the key cannot be encoded.
pub fn public_key_fingerprint(public_key: &PublicKey) -> Result<String> {
    let der = public_key.to_public_key_der()?;
    Ok(STANDARD.encode(Sha256::digest(der)))
}

/// Issuer Snowflake expects for key-pair authentication:
/// `ACCOUNT.LOGIN.SHA256:<fingerprint>`, account and login upper-cased
///
/// # Errors
///
/// Returns [`JwtError::BadParameter`] if the key cannot be encoded.
pub fn snowflake_issuer(public_key: &PublicKey, account: &str, login: &str) -> Result<String> {
    let fingerprint = public_key_fingerprint(public_key)?;
    Ok(format!(
        "{}.{}.SHA256:{fingerprint}",
        account.to_uppercase(),
        login.to_uppercase()
    ))
}

impl JwtKey {
    /// Sign an identity token for a recipient application.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters or a key
    /// without a private half, and [`JwtError::SigningFailed`] when signing
    /// fails.
    pub fn sign_identity(&self, params: &IdentitySignParams) -> Result<String> {
        let sign = || -> Result<String> {
            params.check()?;
            let now = self.now();
            let claims = Claims {
                registered: RegisteredClaims {
                    issuer: self.cluster_name().to_string(),
                    subject: params.username.clone(),
                    audience: Audience::single(&params.uri),
                    expiry: params.expires.map(NumericDate::from),
                    not_before: date(now - skew()),
                    issued_at: date(now),
                    id: String::new(),
                },
                username: params.username.clone(),
                roles: params.roles.clone(),
                traits: params.traits.clone(),
            };
            let options = HeaderOptions {
                key_id: self.best_effort_key_id(),
            };
            self.issue("identity", &TokenClaims::Identity(claims), &options)
        };
        sign().map_err(|e| e.context("sign identity token"))
    }

    /// Sign a token for AWS OIDC federation.
    ///
    /// The `kid` header is present and empty; `obo` carries `user:<username>`.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters or a key
    /// without a private half, and [`JwtError::SigningFailed`] when signing
    /// fails.
    pub fn sign_aws_oidc(&self, params: &AwsOidcSignParams) -> Result<String> {
        let sign = || -> Result<String> {
            params.check()?;
            let now = self.now();
            let claims = AwsOidcClaims {
                registered: RegisteredClaims {
                    issuer: params.issuer.clone(),
                    subject: params.subject.clone(),
                    audience: Audience::single(&params.audience),
                    expiry: params.expires.map(NumericDate::from),
                    not_before: date(now - skew()),
                    issued_at: date(now - skew()),
                    id: Uuid::new_v4().to_string(),
                },
                on_behalf_of: format!("user:{}", params.username),
            };
            let options = HeaderOptions::with_key_id("");
            self.issue("aws_oidc", &TokenClaims::AwsOidc(claims), &options)
        };
        sign().map_err(|e| e.context("sign AWS OIDC token"))
    }

    /// Sign a JWT-SVID for a SPIFFE workload.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::KeyIdUnavailable`] when no `kid` can be computed,
    /// [`JwtError::BadParameter`] for incomplete parameters, and
    /// [`JwtError::SigningFailed`] when signing fails.
    pub fn sign_jwt_svid(&self, params: &JwtSvidSignParams) -> Result<String> {
        let sign = || -> Result<String> {
            params.check()?;
            let now = self.now();
            let expiry = match params.set_expiry {
                Some(expiry) => expiry,
                None => now
                    .checked_add_signed(params.ttl)
                    .ok_or_else(|| JwtError::bad_parameter("ttl out of range"))?,
            };
            let registered = RegisteredClaims {
                issuer: params.issuer.clone(),
                subject: params.spiffe_id.to_string(),
                audience: Audience(params.audiences.clone()),
                expiry: date(expiry),
                not_before: None,
                issued_at: date(params.set_issued_at.unwrap_or(now)),
                id: params.jti.clone(),
            };
            let options = HeaderOptions {
                key_id: Some(self.key_id()?),
            };
            let claims = if params.private_claims.is_empty() {
                TokenClaims::Registered(registered)
            } else {
                TokenClaims::Extended(merge_private_claims(&registered, &params.private_claims)?)
            };
            self.issue("jwt_svid", &claims, &options)
        };
        sign().map_err(|e| e.context("sign JWT-SVID"))
    }

    /// Sign a token for Entra ID workload identity federation.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::KeyIdUnavailable`] when no non-empty `kid` can be
    /// computed, [`JwtError::BadParameter`] for incomplete parameters, and
    /// [`JwtError::SigningFailed`] when signing fails.
    pub fn sign_entra_oidc(&self, params: &EntraOidcSignParams) -> Result<String> {
        let sign = || -> Result<String> {
            params.check()?;
            let kid = self.key_id()?;
            if kid.is_empty() {
                return Err(JwtError::KeyIdUnavailable {
                    reason: "Entra ID requires a non-empty kid".to_string(),
                });
            }
            let now = self.now();
            let claims = RegisteredClaims {
                issuer: params.issuer.clone(),
                subject: params.subject.clone(),
                audience: Audience::single(&params.audience),
                expiry: params.expires.map(NumericDate::from),
                not_before: date(now - skew()),
                issued_at: date(now - skew()),
                id: Uuid::new_v4().to_string(),
            };
            self.issue(
                "entra_oidc",
                &TokenClaims::Registered(claims),
                &HeaderOptions::with_key_id(kid),
            )
        };
        sign().map_err(|e| e.context("sign Entra ID token"))
    }

    /// Sign a Snowflake key-pair authentication token.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters or a key
    /// without a private half, and [`JwtError::SigningFailed`] when signing
    /// fails.
    pub fn sign_snowflake(&self, params: &SnowflakeSignParams) -> Result<String> {
        let sign = || -> Result<String> {
            params.check()?;
            let now = self.now();
            let claims = RegisteredClaims {
                issuer: params.issuer.clone(),
                subject: params.username.clone(),
                audience: Audience::default(),
                expiry: params.expires.map(NumericDate::from),
                not_before: date(now - skew()),
                issued_at: date(now - skew()),
                id: String::new(),
            };
            self.issue(
                "snowflake",
                &TokenClaims::Registered(claims),
                &HeaderOptions::default(),
            )
        };
        sign().map_err(|e| e.context("sign Snowflake token"))
    }

    /// Sign the minimal Azure access token claims.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] without a private key and
    /// [`JwtError::SigningFailed`] when signing fails.
    pub fn sign_azure_token(&self, claims: &AzureTokenClaims) -> Result<String> {
        self.issue(
            "azure_token",
            &TokenClaims::AzureToken(claims.clone()),
            &HeaderOptions::default(),
        )
        .map_err(|e| e.context("sign Azure token"))
    }

    /// Sign a token for a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters or a key
    /// without a private half, and [`JwtError::SigningFailed`] when signing
    /// fails.
    pub fn sign_plugin_token(&self, params: &PluginTokenParams) -> Result<String> {
        let sign = || -> Result<String> {
            params.check()?;
            let now = self.now();
            let claims = RegisteredClaims {
                issuer: params.issuer.clone(),
                subject: params.subject.clone(),
                audience: Audience(params.audience.clone()),
                expiry: params.expires.map(NumericDate::from),
                not_before: date(now - skew()),
                issued_at: date(now),
                id: String::new(),
            };
            let options = HeaderOptions {
                key_id: self.best_effort_key_id(),
            };
            self.issue("plugin", &TokenClaims::Registered(claims), &options)
        };
        sign().map_err(|e| e.context("sign plugin token"))
    }

    /// Sign a short-lived token for a signed PROXY protocol header.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters or a key
    /// without a private half, and [`JwtError::SigningFailed`] when signing
    /// fails.
    pub fn sign_proxy(&self, params: &ProxySignParams) -> Result<String> {
        let sign = || -> Result<String> {
            params.check()?;
            let now = self.now();
            let claims = Claims {
                registered: RegisteredClaims {
                    issuer: params.cluster_name.clone(),
                    subject: params.source_address.clone(),
                    audience: Audience::single(&params.destination_address),
                    expiry: date(now + Duration::seconds(PROXY_TOKEN_LIFETIME_SECONDS)),
                    not_before: date(now),
                    issued_at: date(now),
                    id: String::new(),
                },
                ..Claims::default()
            };
            self.issue(
                "proxy",
                &TokenClaims::Identity(claims),
                &HeaderOptions::default(),
            )
        };
        sign().map_err(|e| e.context("sign PROXY token"))
    }

    /// Verify an identity token issued by this cluster for `params.uri`.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters,
    /// [`JwtError::MalformedToken`] for unparseable input and
    /// [`JwtError::InvalidToken`] for any signature or claim failure.
    pub fn verify_identity(&self, params: &VerifyParams) -> Result<Claims> {
        let verify = || -> Result<Claims> {
            params.check()?;
            let expected = Expected::at(self.now())
                .with_issuer(self.cluster_name())
                .with_subject(&params.username)
                .with_audience(vec![params.uri.clone()]);
            self.verify(&params.raw_token, &expected)
        };
        self.verified("identity", verify())
            .map_err(|e| e.context("verify identity token"))
    }

    /// Verify a token minted for AWS OIDC federation.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters,
    /// [`JwtError::MalformedToken`] for unparseable input and
    /// [`JwtError::InvalidToken`] for any signature or claim failure.
    pub fn verify_aws_oidc(&self, params: &AwsOidcVerifyParams) -> Result<AwsOidcClaims> {
        let verify = || -> Result<AwsOidcClaims> {
            params.check()?;
            let expected = Expected::at(self.now())
                .with_issuer(&params.issuer)
                .with_subject(AWS_OIDC_SUBJECT)
                .with_audience(vec![AWS_OIDC_AUDIENCE.to_string()]);
            self.verify(&params.raw_token, &expected)
        };
        self.verified("aws_oidc", verify())
            .map_err(|e| e.context("verify AWS OIDC token"))
    }

    /// Verify a Snowflake token against the issuer derived from this key.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters,
    /// [`JwtError::MalformedToken`] for unparseable input and
    /// [`JwtError::InvalidToken`] for any signature or claim failure.
    pub fn verify_snowflake(&self, params: &SnowflakeVerifyParams) -> Result<Claims> {
        let verify = || -> Result<Claims> {
            params.check()?;
            let issuer =
                snowflake_issuer(self.public_key(), &params.account_name, &params.login_name)?;
            let subject = format!(
                "{}.{}",
                params.account_name.to_uppercase(),
                params.login_name.to_uppercase()
            );
            let expected = Expected::at(self.now())
                .with_issuer(issuer)
                .with_subject(subject);
            self.verify(&params.raw_token, &expected)
        };
        self.verified("snowflake", verify())
            .map_err(|e| e.context("verify Snowflake token"))
    }

    /// Verify a signed PROXY header token.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters,
    /// [`JwtError::MalformedToken`] for unparseable input and
    /// [`JwtError::InvalidToken`] for any signature or claim failure.
    pub fn verify_proxy(&self, params: &ProxyVerifyParams) -> Result<Claims> {
        let verify = || -> Result<Claims> {
            params.check()?;
            let expected = Expected::at(self.now())
                .with_issuer(&params.cluster_name)
                .with_subject(&params.source_address)
                .with_audience(vec![params.destination_address.clone()]);
            self.verify(&params.raw_token, &expected)
        };
        self.verified("proxy", verify())
            .map_err(|e| e.context("verify PROXY token"))
    }

    /// Verify a plugin token against the parameters it was signed with.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::BadParameter`] for incomplete parameters,
    /// [`JwtError::MalformedToken`] for unparseable input and
    /// [`JwtError::InvalidToken`] for any signature or claim failure.
    pub fn verify_plugin_token(&self, raw: &str, params: &PluginTokenParams) -> Result<Claims> {
        let verify = || -> Result<Claims> {
            params.check_expected()?;
            let expected = Expected::at(self.now())
                .with_issuer(&params.issuer)
                .with_subject(&params.subject)
                .with_audience(params.audience.clone());
            self.verify(raw, &expected)
        };
        self.verified("plugin", verify())
            .map_err(|e| e.context("verify plugin token"))
    }

    /// Verify the signature of an Azure token and decode its claims.
    ///
    /// No claim is checked; see [`JwtKey::verify_signature_only`].
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::MalformedToken`] for unparseable input and
    /// [`JwtError::InvalidToken`] when the signature does not verify.
    pub fn verify_azure_token(&self, raw: &str) -> Result<AzureTokenClaims> {
        let claims = self.verify_signature_only(raw);
        self.verified("azure_token", claims)
            .map_err(|e| e.context("verify Azure token"))
    }

    fn verified<T>(&self, profile: &'static str, result: Result<T>) -> Result<T> {
        if result.is_ok() {
            tracing::debug!(profile, algorithm = %self.algorithm(), "token verified");
        }
        result
    }
}
