//! Token verification
//!
//! [`TokenVerifier::verify_token`] runs three stages, cheapest first, and stops
//! at the first failure:
//!
//! 1. **Content** - segment structure, `alg`, `kid`, `aud`, `iss`, `sub`
//! 2. **Timestamps** - `iat` not in the future and `exp` not in the past, with
//!    300 seconds of clock skew either way
//! 3. **Signature** - RS256 over `header.payload` with the key named by `kid`,
//!    taken from the [`KeySource`]; the only stage that may touch the network

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::codec::TokenSegments;
use crate::config::{
    CLOCK_SKEW_SECONDS, CUSTOM_TOKEN_AUDIENCE, MAX_SUBJECT_LEN, SUPPORTED_ALGORITHM,
    TokenProfile, VerifierConfig,
};
use crate::error::{Result, VerifyError};
use crate::keys::{HttpKeySource, KeySource};
use crate::signature::verify_rs256;
use crate::token::Token;

/// Verifier for one token type of one project
///
/// Holds no mutable state of its own; share it behind an [`Arc`] and call it
/// concurrently. The key source cache is the only shared mutable state.
///
/// # Example
///
/// ```rust,no_run
/// # use securetoken::{TokenVerifier, VerifierConfig};
/// # tokio_test::block_on(async {
/// let verifier = TokenVerifier::from_config(&VerifierConfig::new("my-project"))?;
///
/// match verifier.verify_token("eyJhbGciOiJSUzI1NiIs...").await {
///     Ok(token) => println!("Signed in as {}", token.uid),
///     Err(e) => println!("Rejected: {e}"),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    project_id: String,
    issuer: String,
    profile: TokenProfile,
    key_source: Arc<dyn KeySource>,
}

impl TokenVerifier {
    /// Build a verifier that fetches keys over HTTP with the given client
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Configuration`] if the configuration is invalid.
    pub fn new(config: &VerifierConfig, http_client: reqwest::Client) -> Result<Self> {
        config.validate()?;
        let key_source = HttpKeySource::new(config.effective_key_url(), http_client);
        Self::with_key_source(&config.project_id, config.profile(), Arc::new(key_source))
    }

    /// Build a verifier with its own HTTP client using the configured timeout
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Configuration`] if the configuration is invalid or
    /// the HTTP client cannot be created.
    pub fn from_config(config: &VerifierConfig) -> Result<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.fetch_timeout_duration())
            .build()
            .map_err(|e| {
                VerifyError::Configuration(format!("failed to create HTTP client: {e}"))
            })?;
        Self::new(config, http_client)
    }

    /// Build a verifier around any key source
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Configuration`] if the project id is blank.
    pub fn with_key_source(
        project_id: &str,
        profile: TokenProfile,
        key_source: Arc<dyn KeySource>,
    ) -> Result<Self> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(VerifyError::Configuration(
                "missing project_id".to_string(),
            ));
        }

        Ok(Self {
            project_id: project_id.to_string(),
            issuer: profile.issuer_for(project_id),
            profile,
            key_source,
        })
    }

    /// Expected audience
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Expected issuer
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Token type constants
    pub fn profile(&self) -> &TokenProfile {
        &self.profile
    }

    /// Verify a token and return its decoded claims
    ///
    /// The token is accepted only if it is a well-formed RS256 JWT with a `kid`
    /// header, its `aud` is the project id and its `iss` the profile's issuer
    /// for that project, its `sub` is non-empty and at most 128 characters, it
    /// is within its validity window, and its signature verifies against the
    /// key named by `kid`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`VerifyError`]; nothing is retried.
    pub async fn verify_token(&self, token: &str) -> Result<Token> {
        if token.is_empty() {
            return Err(VerifyError::EmptyToken {
                kind: self.profile.short_name,
            });
        }

        let payload = self.verify_content(token)?;
        self.verify_timestamps(&payload, unix_now())?;

        // Needs the key cache and possibly a network round trip, so it goes last.
        self.verify_signature(token).await?;

        debug!(
            kind = self.profile.short_name,
            subject = %payload.subject,
            "Token verified"
        );
        Ok(payload)
    }

    fn verify_content(&self, token: &str) -> Result<Token> {
        let segments = TokenSegments::split(token)?;
        let header = segments.header()?;
        let mut payload = segments.payload()?;
        let kind = self.profile.short_name;

        if header.key_id().is_none() {
            if payload.audience == CUSTOM_TOKEN_AUDIENCE {
                return Err(self.invalid_claim(
                    "aud",
                    None,
                    Some(payload.audience),
                    format!("expected {} but got a custom token", self.profile.articled_name),
                ));
            }
            return Err(self.invalid_claim("kid", None, None, format!("{kind} has no 'kid' header")));
        }

        if header.algorithm != SUPPORTED_ALGORITHM {
            let message = format!(
                "{kind} has invalid algorithm; expected {SUPPORTED_ALGORITHM:?} but got {:?}",
                header.algorithm
            );
            return Err(self.invalid_claim(
                "alg",
                Some(SUPPORTED_ALGORITHM.to_string()),
                Some(header.algorithm),
                message,
            ));
        }

        if payload.audience != self.project_id {
            let message = format!(
                "{kind} has invalid 'aud' (audience) claim; expected {:?} but got {:?}; {}",
                self.project_id,
                payload.audience,
                self.project_mismatch_hint()
            );
            return Err(self.invalid_claim(
                "aud",
                Some(self.project_id.clone()),
                Some(payload.audience),
                message,
            ));
        }

        if payload.issuer != self.issuer {
            let message = format!(
                "{kind} has invalid 'iss' (issuer) claim; expected {:?} but got {:?}; {}",
                self.issuer,
                payload.issuer,
                self.project_mismatch_hint()
            );
            return Err(self.invalid_claim(
                "iss",
                Some(self.issuer.clone()),
                Some(payload.issuer),
                message,
            ));
        }

        if payload.subject.is_empty() {
            return Err(self.invalid_claim(
                "sub",
                None,
                None,
                format!("{kind} has empty 'sub' (subject) claim"),
            ));
        }

        if payload.subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(self.invalid_claim(
                "sub",
                None,
                Some(payload.subject),
                format!("{kind} has a 'sub' (subject) claim longer than {MAX_SUBJECT_LEN} characters"),
            ));
        }

        payload.uid = payload.subject.clone();
        Ok(payload)
    }

    fn verify_timestamps(&self, payload: &Token, now: i64) -> Result<()> {
        let kind = self.profile.short_name;

        if payload.issued_at.saturating_sub(CLOCK_SKEW_SECONDS) > now {
            return Err(VerifyError::ExpiredOrNotYetValid {
                message: format!("{kind} issued at future timestamp: {}", payload.issued_at),
            });
        }
        if payload.expires.saturating_add(CLOCK_SKEW_SECONDS) < now {
            return Err(VerifyError::ExpiredOrNotYetValid {
                message: format!("{kind} has expired at: {}", payload.expires),
            });
        }
        Ok(())
    }

    async fn verify_signature(&self, token: &str) -> Result<()> {
        // Decode again rather than threading the header through the earlier stages.
        let segments = TokenSegments::split(token)?;
        let header = segments.header()?;
        let kid = header.key_id().unwrap_or_default();

        let keys = self.key_source.keys().await?;

        // A signature that is not valid base64 cannot match any key.
        let Ok(signature) = segments.signature() else {
            return Err(self.signature_failure(kid));
        };
        let message = segments.signing_input();

        let verified = keys
            .iter()
            .filter(|key| key.kid() == kid)
            .any(|key| verify_rs256(message.as_bytes(), &signature, key));

        if verified {
            Ok(())
        } else {
            Err(self.signature_failure(kid))
        }
    }

    fn signature_failure(&self, kid: &str) -> VerifyError {
        warn!(kind = self.profile.short_name, kid = kid, "Token signature did not verify");
        VerifyError::SignatureVerification {
            kind: self.profile.short_name,
        }
    }

    fn invalid_claim(
        &self,
        claim: &'static str,
        expected: Option<String>,
        actual: Option<String>,
        message: String,
    ) -> VerifyError {
        VerifyError::InvalidClaims {
            claim,
            expected,
            actual,
            message: format!(
                "{message}; see {} for details on how to retrieve a valid {}",
                self.profile.doc_url, self.profile.short_name
            ),
        }
    }

    fn project_mismatch_hint(&self) -> String {
        format!(
            "make sure the {} comes from the same project as the credential used to \
             authenticate this verifier",
            self.profile.short_name
        )
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
