//! Error types for token issuance and verification

use thiserror::Error;

/// Result type for token operations
pub type Result<T> = std::result::Result<T, JwtError>;

/// Errors produced while signing or verifying tokens.
///
/// Verification failures caused by a bad signature or by a claim mismatch are
/// both reported as [`JwtError::InvalidToken`], which carries no detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// A request parameter is missing or malformed
    #[error("Bad parameter: {reason}")]
    BadParameter { reason: String },

    /// The key belongs to a family outside RSA, P-256 and Ed25519
    #[error("Unsupported key type: {reason}")]
    UnsupportedKeyType { reason: String },

    /// The underlying signature computation failed
    #[error("Signing failed: {reason}")]
    SigningFailed { reason: String },

    /// The key identifier could not be computed for the public key
    #[error("Key ID unavailable: {reason}")]
    KeyIdUnavailable { reason: String },

    /// The compact serialization could not be parsed
    #[error("Malformed token: {reason}")]
    MalformedToken { reason: String },

    /// Signature or claims did not verify
    #[error("Invalid token")]
    InvalidToken,

    /// A temporal policy rejected the token
    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },
}

impl JwtError {
    pub(crate) fn bad_parameter(reason: impl Into<String>) -> Self {
        Self::BadParameter {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    /// Prefix the error reason with the name of the failing operation.
    ///
    /// [`JwtError::InvalidToken`] is returned unchanged.
    #[must_use]
    pub fn context(self, operation: &str) -> Self {
        let prefix = |reason: String| format!("{operation}: {reason}");
        match self {
            Self::BadParameter { reason } => Self::BadParameter {
                reason: prefix(reason),
            },
            Self::UnsupportedKeyType { reason } => Self::UnsupportedKeyType {
                reason: prefix(reason),
            },
            Self::SigningFailed { reason } => Self::SigningFailed {
                reason: prefix(reason),
            },
            Self::KeyIdUnavailable { reason } => Self::KeyIdUnavailable {
                reason: prefix(reason),
            },
            Self::MalformedToken { reason } => Self::MalformedToken {
                reason: prefix(reason),
            },
            Self::AccessDenied { reason } => Self::AccessDenied {
                reason: prefix(reason),
            },
            Self::InvalidToken => Self::InvalidToken,
        }
    }

    /// Whether the caller can fix this error by correcting its input
    pub fn is_bad_parameter(&self) -> bool {
        matches!(self, Self::BadParameter { .. })
    }

    /// Whether verification rejected the token
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken)
    }

    /// Whether a temporal policy denied access
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::BadParameter { .. } => "bad_parameter",
            Self::UnsupportedKeyType { .. } => "unsupported_key_type",
            Self::SigningFailed { .. } => "signing_failed",
            Self::KeyIdUnavailable { .. } => "key_id_unavailable",
            Self::MalformedToken { .. } => "malformed_token",
            Self::InvalidToken => "invalid_token",
            Self::AccessDenied { .. } => "access_denied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_prefixes_reason() {
        let err = JwtError::bad_parameter("username missing").context("sign identity token");
        assert_eq!(
            err.to_string(),
            "Bad parameter: sign identity token: username missing"
        );
        assert!(err.is_bad_parameter());
    }

    #[test]
    fn test_invalid_token_stays_opaque() {
        let err = JwtError::InvalidToken.context("verify identity token");
        assert_eq!(err, JwtError::InvalidToken);
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn test_error_categorization() {
        let denied = JwtError::AccessDenied {
            reason: "token not before in future".to_string(),
        };
        assert!(denied.is_access_denied());
        assert!(!denied.is_invalid_token());
        assert_eq!(denied.category(), "access_denied");
        assert_eq!(JwtError::InvalidToken.category(), "invalid_token");
    }
}
