//! Public keys of the token issuer
//!
//! - [`parse`] turns PEM certificates into [`PublicKey`]s
//! - [`http`] fetches and caches the issuer's key set, honoring `Cache-Control`
//!
//! The verifier only depends on the [`KeySource`] trait, so tests can inject a
//! [`StaticKeySource`] instead of the HTTP-backed one.

pub mod http;
pub mod parse;

pub use http::HttpKeySource;
pub use parse::{parse_key_set, parse_public_key};

use async_trait::async_trait;
use rsa::RsaPublicKey;
use std::sync::Arc;

use crate::error::Result;

/// An RSA public key together with its key id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    kid: String,
    key: RsaPublicKey,
}

impl PublicKey {
    /// Pair a key id with an RSA key
    pub fn new(kid: impl Into<String>, key: RsaPublicKey) -> Self {
        Self {
            kid: kid.into(),
            key,
        }
    }

    /// Key id, as referenced by a token's `kid` header
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The RSA key
    pub fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }
}

/// Supplier of the current trusted key set
#[async_trait]
pub trait KeySource: Send + Sync + std::fmt::Debug {
    /// Current keys; may refresh a cache and therefore wait on the network
    ///
    /// # Errors
    ///
    /// Returns an error when no usable key set can be produced.
    async fn keys(&self) -> Result<Arc<[PublicKey]>>;
}

/// Fixed, in-memory key set
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    keys: Arc<[PublicKey]>,
}

impl StaticKeySource {
    /// Serve exactly these keys
    pub fn new(keys: Vec<PublicKey>) -> Self {
        Self { keys: keys.into() }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn keys(&self) -> Result<Arc<[PublicKey]>> {
        Ok(Arc::clone(&self.keys))
    }
}
