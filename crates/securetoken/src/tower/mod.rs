//! # Tower Middleware
//!
//! [`VerifyLayer`] wraps an HTTP service so that every request must carry a
//! valid token in its `Authorization: Bearer` header.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tower::ServiceBuilder;
//! use securetoken::tower::VerifyLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(VerifyLayer::new(Arc::new(verifier)))
//!     .service(my_http_handler);
//! ```
//!
//! ## Forwarded Identity
//!
//! On success the inner service sees:
//!
//! - `fb-userid: <uid>`
//! - `fbclaim-<name>: <value>` for each additional claim (strings verbatim,
//!   anything else as compact JSON)
//! - the verified [`Token`](crate::Token) in the request extensions
//!
//! Inbound headers with those names are removed before forwarding, so a client
//! cannot supply them itself. Requests without a valid token are answered with
//! `401 Unauthorized` and never reach the inner service.

mod layer;
mod service;

pub use layer::VerifyLayer;
pub use service::{VerifyService, VerifyServiceFuture};

/// Header names used by the middleware
#[derive(Debug, Clone)]
pub struct VerifyLayerConfig {
    /// Header carrying the bearer token (default: "authorization")
    pub auth_header: String,
    /// Header set to the verified user id (default: "fb-userid")
    pub user_id_header: String,
    /// Prefix of the per-claim headers (default: "fbclaim-")
    pub claim_header_prefix: String,
}

impl Default for VerifyLayerConfig {
    fn default() -> Self {
        Self {
            auth_header: "authorization".to_string(),
            user_id_header: "fb-userid".to_string(),
            claim_header_prefix: "fbclaim-".to_string(),
        }
    }
}

impl VerifyLayerConfig {
    /// Set the header the token is read from
    #[must_use]
    pub fn auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    /// Set the user id header name
    #[must_use]
    pub fn user_id_header(mut self, header: impl Into<String>) -> Self {
        self.user_id_header = header.into();
        self
    }

    /// Set the claim header prefix
    #[must_use]
    pub fn claim_header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.claim_header_prefix = prefix.into();
        self
    }

    /// Whether an inbound header would collide with one the middleware sets
    pub fn is_reserved_header(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.user_id_header)
            || name
                .get(..self.claim_header_prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(&self.claim_header_prefix))
    }
}
