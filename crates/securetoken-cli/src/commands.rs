//! Subcommand implementations

use securetoken::{HttpKeySource, KeySource, Token, TokenVerifier, VerifierConfig};
use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::error::CliResult;

/// Key set summary printed by `keys`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct KeySetSummary {
    /// Where the keys were fetched from
    pub key_url: String,
    /// Key ids, sorted
    pub key_ids: Vec<String>,
    /// Unix time at which the cached set expires
    pub expires_at: Option<u64>,
}

/// Verify `token` and render it as JSON, open claims included
///
/// # Errors
///
/// Returns the verifier's error if the token is rejected.
pub async fn verify(config: &VerifierConfig, token: &str) -> CliResult<Value> {
    let verifier = TokenVerifier::from_config(config)?;
    let token = verifier.verify_token(token.trim()).await?;
    info!(uid = %token.uid, "Token is valid");
    render_token(&token)
}

/// Fetch the key set the verifier would use
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the keys cannot be fetched.
pub async fn keys(config: &VerifierConfig) -> CliResult<KeySetSummary> {
    config.validate()?;
    let http_client = reqwest::Client::builder()
        .timeout(config.fetch_timeout_duration())
        .build()?;
    let source = HttpKeySource::new(config.effective_key_url(), http_client);

    let keys = source.keys().await?;
    let expires_at = source
        .expires_at()
        .await
        .and_then(|at| at.duration_since(UNIX_EPOCH).ok())
        .map(|since| since.as_secs());

    Ok(KeySetSummary {
        key_url: source.key_url().to_string(),
        key_ids: keys.iter().map(|key| key.kid().to_string()).collect(),
        expires_at,
    })
}

fn render_token(token: &Token) -> CliResult<Value> {
    let mut rendered = serde_json::to_value(token)?;
    if let Value::Object(fields) = &mut rendered {
        fields.insert("claims".to_string(), Value::Object(token.claims.clone()));
    }
    Ok(rendered)
}

/// Seconds until `expires_at`, for human-oriented logging
pub fn seconds_until(expires_at: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    expires_at.saturating_sub(now)
}
