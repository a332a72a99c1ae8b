//! Verifier configuration types
//!
//! The two supported token types differ only in a handful of string constants,
//! so they are expressed as two [`TokenProfile`] presets selected by
//! [`TokenType`] rather than as two verifier implementations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, VerifyError};

/// Signature algorithm accepted in the `alg` header
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// Allowed drift between the issuer's clock and ours
pub const CLOCK_SKEW_SECONDS: i64 = 300;

/// Audience carried by backend-issued custom tokens, which are never accepted here
pub const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Maximum subject length in characters
pub const MAX_SUBJECT_LEN: usize = 128;

/// Constants distinguishing one token type from another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenProfile {
    /// Label used in error messages ("ID token")
    pub short_name: &'static str,
    /// Label with an article ("an ID token")
    pub articled_name: &'static str,
    /// Where operators can read how to obtain a valid token
    pub doc_url: &'static str,
    /// Issuer is this prefix followed by the project id
    pub issuer_prefix: &'static str,
    /// Endpoint serving `{kid: PEM certificate}`
    pub key_url: &'static str,
}

impl TokenProfile {
    /// ID tokens minted for signed-in users
    pub const ID_TOKEN: TokenProfile = TokenProfile {
        short_name: "ID token",
        articled_name: "an ID token",
        doc_url: "https://firebase.google.com/docs/auth/admin/verify-id-tokens",
        issuer_prefix: "https://securetoken.google.com/",
        key_url: "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com",
    };

    /// Session cookies minted from ID tokens
    pub const SESSION_COOKIE: TokenProfile = TokenProfile {
        short_name: "session cookie",
        articled_name: "a session cookie",
        doc_url: "https://firebase.google.com/docs/auth/admin/manage-cookies",
        issuer_prefix: "https://session.firebase.google.com/",
        key_url: "https://www.googleapis.com/identitytoolkit/v3/relyingparty/publicKeys",
    };

    /// Expected `iss` claim for a project
    pub fn issuer_for(&self, project_id: &str) -> String {
        format!("{}{}", self.issuer_prefix, project_id)
    }
}

/// Which kind of token a verifier accepts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// ID token (`Authorization: Bearer` from client SDKs)
    #[default]
    IdToken,
    /// Session cookie
    SessionCookie,
}

impl TokenType {
    /// Preset constants for this token type
    pub fn profile(self) -> TokenProfile {
        match self {
            TokenType::IdToken => TokenProfile::ID_TOKEN,
            TokenType::SessionCookie => TokenProfile::SESSION_COOKIE,
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

/// Verifier configuration
///
/// Only `project_id` is required. The struct deserializes from any serde
/// format, so it can be embedded in a larger service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Project identifier; the expected `aud` claim and issuer suffix
    pub project_id: String,
    /// Token type to accept
    #[serde(default)]
    pub token_type: TokenType,
    /// Override for the key-distribution URL (emulators, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_url: Option<String>,
    /// Timeout for one key refresh request
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl VerifierConfig {
    /// Create a configuration for ID tokens of the given project
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            token_type: TokenType::IdToken,
            key_url: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }

    /// Select the token type
    #[must_use]
    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    /// Override the key-distribution URL
    #[must_use]
    pub fn key_url(mut self, key_url: impl Into<String>) -> Self {
        self.key_url = Some(key_url.into());
        self
    }

    /// Set the key refresh timeout
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_secs = timeout.as_secs();
        self
    }

    /// Preset constants for the configured token type
    pub fn profile(&self) -> TokenProfile {
        self.token_type.profile()
    }

    /// Key URL after applying the override
    pub fn effective_key_url(&self) -> &str {
        self.key_url
            .as_deref()
            .unwrap_or(self.token_type.profile().key_url)
    }

    /// Key refresh timeout as a [`Duration`]
    pub fn fetch_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Check the configuration and return the trimmed project id
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Configuration`] if the project id is blank, the key
    /// URL override is neither HTTPS nor loopback HTTP, or the timeout is zero.
    pub fn validate(&self) -> Result<&str> {
        let project_id = self.project_id.trim();
        if project_id.is_empty() {
            return Err(VerifyError::Configuration(
                "missing project_id".to_string(),
            ));
        }

        if let Some(url) = &self.key_url
            && !is_allowed_key_url(url)
        {
            return Err(VerifyError::Configuration(format!(
                "key_url must use HTTPS (HTTP only allowed for loopback hosts): {url}"
            )));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(VerifyError::Configuration(
                "fetch_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(project_id)
    }
}

fn is_allowed_key_url(url: &str) -> bool {
    if url.starts_with("https://") {
        return true;
    }
    ["http://localhost", "http://127.0.0.1", "http://[::1]"]
        .iter()
        .any(|prefix| {
            url.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with([':', '/']))
        })
}
