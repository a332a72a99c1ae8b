//! # securetoken - Offline Bearer Token Verification
//!
//! Verifies RS256-signed ID tokens and session cookies issued by the identity
//! backend without a network round trip per request. Public keys are fetched
//! from the issuer's X.509 key endpoint and cached for as long as the endpoint's
//! `Cache-Control: max-age` allows.
//!
//! ## Architecture
//!
//! - [`codec`] - Splits and decodes `header.payload.signature`
//! - [`verifier`] - [`TokenVerifier`]: content, timestamp and signature checks
//! - [`keys`] - [`KeySource`] trait, PEM certificate parsing, HTTP key cache
//! - [`signature`] - RS256 signature check against one candidate key
//! - [`config`] - [`VerifierConfig`] and the ID token / session cookie presets
//! - [`error`] - [`VerifyError`] taxonomy
//! - `tower` - Bearer middleware (feature `middleware`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use securetoken::{TokenType, TokenVerifier, VerifierConfig};
//!
//! # tokio_test::block_on(async {
//! let config = VerifierConfig::new("my-project").token_type(TokenType::IdToken);
//! let verifier = TokenVerifier::from_config(&config)?;
//!
//! let token = verifier.verify_token("eyJhbGciOiJSUzI1NiIs...").await?;
//! println!("uid={} provider={}", token.uid, token.provider.sign_in_provider);
//! # Ok::<(), securetoken::VerifyError>(())
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! - `middleware` (default) - Tower `Layer`/`Service` that authenticates
//!   `Authorization: Bearer` requests and forwards the claims as headers
//! - `tower` - Alias for `middleware`

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod signature;
pub mod token;
pub mod verifier;

#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod tower;

#[doc(inline)]
pub use codec::{Header, TokenSegments};
#[doc(inline)]
pub use config::{TokenProfile, TokenType, VerifierConfig};
#[doc(inline)]
pub use error::{Result, VerifyError};
#[doc(inline)]
pub use keys::{HttpKeySource, KeySource, PublicKey, StaticKeySource};
#[doc(inline)]
pub use signature::verify_rs256;
#[doc(inline)]
pub use token::{ProviderInfo, Token};
#[doc(inline)]
pub use verifier::TokenVerifier;
