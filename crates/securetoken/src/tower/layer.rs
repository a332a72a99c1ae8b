//! Tower Layer implementation for token verification

use std::sync::Arc;
use tower::Layer;

use crate::verifier::TokenVerifier;

use super::VerifyLayerConfig;
use super::service::VerifyService;

/// Tower Layer that requires a verified bearer token
///
/// Wraps inner services with [`VerifyService`]. The verifier is shared by
/// every service the layer produces, and so is its key cache.
#[derive(Debug, Clone)]
pub struct VerifyLayer {
    verifier: Arc<TokenVerifier>,
    config: VerifyLayerConfig,
}

impl VerifyLayer {
    /// Create a layer with the default header names
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self {
            verifier,
            config: VerifyLayerConfig::default(),
        }
    }

    /// Create a layer with custom header names
    pub fn with_config(verifier: Arc<TokenVerifier>, config: VerifyLayerConfig) -> Self {
        Self { verifier, config }
    }

    /// Replace the header configuration
    #[must_use]
    pub fn config(mut self, config: VerifyLayerConfig) -> Self {
        self.config = config;
        self
    }
}

impl<S> Layer<S> for VerifyLayer {
    type Service = VerifyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        VerifyService::new(inner, Arc::clone(&self.verifier), self.config.clone())
    }
}
