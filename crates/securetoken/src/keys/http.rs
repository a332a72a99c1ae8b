//! Key set fetching and caching
//!
//! [`HttpKeySource`] downloads `{kid: PEM certificate}` from the issuer and keeps
//! the parsed keys in memory until the response's `Cache-Control: max-age`
//! elapses:
//!
//! - **Lazy refresh**: nothing runs in the background; the first caller that
//!   finds the cache empty or expired performs the fetch
//! - **One fetch at a time**: the cache lock is held across the request, so
//!   callers that queue behind a refresh reuse its result instead of fetching again
//! - **Stale on error**: if a refresh fails but keys were cached before, the old
//!   keys keep being served
//! - **Atomic replacement**: the key set and its expiry are swapped together, and
//!   only after a fully successful refresh

use async_trait::async_trait;
use http::HeaderMap;
use http::header::CACHE_CONTROL;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{KeySource, PublicKey, parse_key_set};
use crate::error::{Result, VerifyError};

/// Cached key set with its expiry
#[derive(Debug)]
struct KeyCache {
    keys: Arc<[PublicKey]>,
    expires_at: SystemTime,
}

impl KeyCache {
    fn empty() -> Self {
        Self {
            keys: Arc::from(Vec::new()),
            expires_at: SystemTime::UNIX_EPOCH,
        }
    }

    /// Whether a refresh is due at `now`
    fn needs_refresh(&self, now: SystemTime) -> bool {
        self.keys.is_empty() || self.expires_at <= now
    }
}

/// Key source backed by an HTTP endpoint
///
/// # Example
///
/// ```rust,no_run
/// # use securetoken::{HttpKeySource, KeySource};
/// # tokio_test::block_on(async {
/// let source = HttpKeySource::new(
///     "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com",
///     reqwest::Client::new(),
/// );
///
/// let keys = source.keys().await?;
/// println!("{} keys cached", keys.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug)]
pub struct HttpKeySource {
    key_url: String,
    http_client: reqwest::Client,
    cache: Mutex<KeyCache>,
}

impl HttpKeySource {
    /// Create a key source with an empty cache
    pub fn new(key_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            key_url: key_url.into(),
            http_client,
            cache: Mutex::new(KeyCache::empty()),
        }
    }

    /// The key-distribution endpoint
    pub fn key_url(&self) -> &str {
        &self.key_url
    }

    /// When the cached keys expire, if any keys are cached
    pub async fn expires_at(&self) -> Option<SystemTime> {
        let cache = self.cache.lock().await;
        (!cache.keys.is_empty()).then_some(cache.expires_at)
    }

    /// Download and parse the key set, returning it with its freshness lifetime
    async fn fetch(&self) -> Result<(Vec<PublicKey>, Duration)> {
        info!(key_url = %self.key_url, "Fetching public keys");

        let response = self
            .http_client
            .get(&self.key_url)
            .send()
            .await
            .map_err(|e| {
                error!(key_url = %self.key_url, error = %e, "Failed to fetch public keys");
                VerifyError::KeyFetch(format!("request to {} failed: {e}", self.key_url))
            })?;

        let status = response.status();
        let max_age = max_age(response.headers());
        let body = response.bytes().await.map_err(|e| {
            VerifyError::KeyFetch(format!("failed to read response body: {e}"))
        })?;

        if status != reqwest::StatusCode::OK {
            error!(
                key_url = %self.key_url,
                status = %status,
                "Key endpoint returned error status"
            );
            return Err(VerifyError::KeyFetch(format!(
                "invalid response ({}) while retrieving public keys: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        let keys = parse_key_set(&body)?;
        let max_age = max_age.ok_or(VerifyError::MissingMaxAge)?;

        info!(
            key_url = %self.key_url,
            key_count = keys.len(),
            max_age_secs = max_age.as_secs(),
            "Successfully fetched public keys"
        );

        Ok((keys, max_age))
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn keys(&self) -> Result<Arc<[PublicKey]>> {
        let mut cache = self.cache.lock().await;

        if !cache.needs_refresh(SystemTime::now()) {
            debug!(key_url = %self.key_url, "Using cached public keys");
            return Ok(Arc::clone(&cache.keys));
        }

        match self.fetch().await {
            Ok((keys, max_age)) => {
                *cache = KeyCache {
                    keys: keys.into(),
                    expires_at: SystemTime::now() + max_age,
                };
            }
            Err(e) if cache.keys.is_empty() => return Err(e),
            Err(e) => {
                warn!(
                    key_url = %self.key_url,
                    error = %e,
                    cached_keys = cache.keys.len(),
                    "Key refresh failed, serving stale keys"
                );
            }
        }

        Ok(Arc::clone(&cache.keys))
    }
}

/// Freshness lifetime from the `max-age` directive of `Cache-Control`
///
/// A directive whose value is not a non-negative integer counts as absent.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|directive| {
            directive
                .trim()
                .strip_prefix("max-age=")
                .and_then(|seconds| seconds.parse::<u64>().ok())
        })
        .map(Duration::from_secs)
}
