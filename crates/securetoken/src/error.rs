//! Error taxonomy for token verification
//!
//! Every failure of [`TokenVerifier::verify_token`](crate::TokenVerifier::verify_token)
//! and of a [`KeySource`](crate::KeySource) is reported as a [`VerifyError`]. The
//! variants are meant for operator diagnostics; a request boundary should collapse
//! all of them into a single "unauthorized" answer.

use thiserror::Error;

/// Result type for verification operations
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Token verification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// A required construction parameter is missing or invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The token string was empty
    #[error("{kind} must be a non-empty string")]
    EmptyToken {
        /// Short name of the token type ("ID token", "session cookie")
        kind: &'static str,
    },

    /// The token does not have exactly three dot-separated segments
    #[error("incorrect number of segments: expected 3 but got {segments}")]
    MalformedToken {
        /// Number of segments found
        segments: usize,
    },

    /// A segment is not valid unpadded URL-safe base64, or not valid JSON
    #[error("failed to decode token {segment}: {reason}")]
    Decode {
        /// Which segment failed ("header", "payload", "signature")
        segment: &'static str,
        /// Underlying decoder message
        reason: String,
    },

    /// A header field or claim does not have the expected value
    #[error("{message}")]
    InvalidClaims {
        /// Name of the offending claim or header field
        claim: &'static str,
        /// Expected value, when there is a single one
        expected: Option<String>,
        /// Value found in the token
        actual: Option<String>,
        /// Full explanation, ending with a documentation pointer
        message: String,
    },

    /// The token was issued in the future or has already expired
    #[error("{message}")]
    ExpiredOrNotYetValid {
        /// Human-readable explanation including the offending timestamp
        message: String,
    },

    /// The key-distribution endpoint could not be reached or answered non-200
    #[error("failed to fetch public keys: {0}")]
    KeyFetch(String),

    /// A certificate in the key set could not be turned into an RSA public key
    #[error("failed to parse public key: {0}")]
    KeyParse(String),

    /// The key response carried no usable `Cache-Control: max-age` directive
    #[error("could not find expiry time from HTTP headers: missing Cache-Control max-age")]
    MissingMaxAge,

    /// No candidate key verified the token signature
    #[error("failed to verify {kind} signature")]
    SignatureVerification {
        /// Short name of the token type
        kind: &'static str,
    },
}

impl VerifyError {
    /// Stable label for logs and metrics
    pub fn category(&self) -> &'static str {
        match self {
            VerifyError::Configuration(_) => "configuration",
            VerifyError::EmptyToken { .. } => "empty_token",
            VerifyError::MalformedToken { .. } => "malformed_token",
            VerifyError::Decode { .. } => "decode",
            VerifyError::InvalidClaims { .. } => "invalid_claims",
            VerifyError::ExpiredOrNotYetValid { .. } => "expired_or_not_yet_valid",
            VerifyError::KeyFetch(_) => "key_fetch",
            VerifyError::KeyParse(_) => "key_parse",
            VerifyError::MissingMaxAge => "missing_max_age",
            VerifyError::SignatureVerification { .. } => "signature_verification",
        }
    }

    /// Whether the failure came from obtaining keys rather than from the token itself
    pub fn is_key_source_error(&self) -> bool {
        matches!(
            self,
            VerifyError::KeyFetch(_) | VerifyError::KeyParse(_) | VerifyError::MissingMaxAge
        )
    }
}
