//! # credmint-jwt
//!
//! Issue and verify asymmetrically signed JSON Web Tokens (RFC 7519) for the
//! components of an access-control system and the third parties it federates
//! with.
//!
//! ## Core Features
//!
//! - **Algorithm per key family** - RSA signs RS256, P-256 signs ES256,
//!   Ed25519 signs EdDSA. Other families are rejected.
//! - **Claim profiles** - identity, AWS OIDC, JWT-SVID, Entra ID, Snowflake,
//!   plugin, PROXY header and Azure tokens, each with its own claims, skew and
//!   `kid` policy
//! - **Opaque signers** - HSM or remote keys plug in through [`OpaqueSigner`]
//! - **Oracle-free verification** - signature and claim failures are the same
//!   [`JwtError::InvalidToken`]
//! - **Injected clock** - every time decision goes through [`Clock`]
//!
//! ## Architecture
//!
//! - `algorithm` - key family to signature algorithm
//! - `keys` - public and private key material, opaque signer capability
//! - `key_id` - `kid` computation (RFC 7638 thumbprint by default)
//! - `signer` - compact JWS serialization
//! - `claims` - claim shapes and the private-claim merge
//! - `params` - request parameters and their completeness checks
//! - `profiles` - per-consumer sign and verify operations on [`JwtKey`]
//! - `verifier` - signature check and expected-claims predicate
//! - `introspection` - not-before check for externally issued tokens
//! - `timestamp` - integer and fractional numeric dates
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use credmint_jwt::{IdentitySignParams, JwtKey, KeyConfig, PrivateKey, VerifyParams};
//!
//! # fn main() -> credmint_jwt::Result<()> {
//! # let pem = "";
//! let key = Arc::new(JwtKey::new(
//!     KeyConfig::new("example-cluster").with_private_key(PrivateKey::from_pem(pem)?),
//! )?);
//!
//! let token = key.sign_identity(&IdentitySignParams {
//!     username: "alice".into(),
//!     roles: vec!["editor".into()],
//!     expires: Some(Utc::now() + Duration::minutes(5)),
//!     uri: "https://grafana.example.com".into(),
//!     ..Default::default()
//! })?;
//!
//! let claims = key.verify_identity(&VerifyParams {
//!     username: "alice".into(),
//!     raw_token: token,
//!     uri: "https://grafana.example.com".into(),
//! })?;
//! assert_eq!(claims.username, "alice");
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod claims;
pub mod clock;
pub mod config;
pub mod errors;
pub mod introspection;
pub mod key;
pub mod key_id;
pub mod keys;
pub mod params;
pub mod profiles;
pub mod signer;
pub mod timestamp;
pub mod token;
pub mod verifier;

pub use algorithm::{SigningAlgorithm, algorithm_for_public_key};
pub use claims::{
    Audience, AwsOidcClaims, AzureTokenClaims, Claims, REGISTERED_CLAIM_NAMES, RegisteredClaims,
    TokenClaims, merge_private_claims,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DEFAULT_VERIFY_LEEWAY_SECONDS, KeyConfig, KeyOptions, MAX_VERIFY_LEEWAY_SECONDS,
};
pub use errors::{JwtError, Result};
pub use introspection::{IdToken, check_not_before};
pub use key::JwtKey;
pub use key_id::{JwkThumbprint, KeyIdentifier, compute_jwk_thumbprint};
pub use keys::{OpaqueSigner, PrivateKey, PublicKey, SignatureFormat};
pub use params::{
    AwsOidcSignParams, AwsOidcVerifyParams, EntraOidcSignParams, IdentitySignParams,
    JwtSvidSignParams, PluginTokenParams, ProxySignParams, ProxyVerifyParams, SnowflakeSignParams,
    SnowflakeVerifyParams, VerifyParams,
};
pub use profiles::{public_key_fingerprint, snowflake_issuer};
pub use signer::{HeaderOptions, Signer};
pub use spiffe::SpiffeId;
pub use timestamp::NumericDate;
pub use token::UnverifiedToken;
pub use verifier::Expected;

/// Seconds subtracted from the signing time for `nbf`, tolerating clock drift
/// between signer and verifier
pub const NOT_BEFORE_SKEW_SECONDS: i64 = 10;

/// Lifetime of PROXY header tokens in seconds
pub const PROXY_TOKEN_LIFETIME_SECONDS: i64 = 60;

/// Value of the `typ` header on every issued token
pub const JWT_TYPE: &str = "JWT";

/// Subject of tokens minted for the AWS OIDC integration
pub const AWS_OIDC_SUBJECT: &str = "system:proxy";

/// Audience of tokens minted for the AWS OIDC integration
pub const AWS_OIDC_AUDIENCE: &str = "discover.teleport";
