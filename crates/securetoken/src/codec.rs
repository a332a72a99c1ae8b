//! Compact JWS decoding
//!
//! A token is `header.payload.signature`, each segment unpadded URL-safe
//! base64. The header and payload decode to JSON objects; the signature is only
//! decoded when it is checked.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, VerifyError};
use crate::token::{Token, strip_registered_claims};

/// JOSE header of a token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// `alg`
    #[serde(rename = "alg", default)]
    pub algorithm: String,
    /// `typ`
    #[serde(rename = "typ", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// `kid`; absent on custom tokens
    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

impl Header {
    /// Key id, treating an empty string as absent
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref().filter(|kid| !kid.is_empty())
    }
}

/// The three raw segments of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSegments<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
}

impl<'a> TokenSegments<'a> {
    /// Split a token on `.`
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::MalformedToken`] unless there are exactly three segments.
    pub fn split(token: &'a str) -> Result<Self> {
        let mut parts = token.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(header), Some(payload), Some(signature), None) => Ok(Self {
                header,
                payload,
                signature,
            }),
            _ => Err(VerifyError::MalformedToken {
                segments: token.split('.').count(),
            }),
        }
    }

    /// Decode the header segment
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Decode`] on bad base64 or JSON.
    pub fn header(&self) -> Result<Header> {
        decode_segment(self.header, "header")
    }

    /// Decode the payload into a [`Token`] whose `claims` hold the unregistered claims
    ///
    /// The payload is decoded twice: once into the typed fields and once into an
    /// untyped map from which the registered names are removed.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Decode`] on bad base64 or JSON.
    pub fn payload(&self) -> Result<Token> {
        let mut token: Token = decode_segment(self.payload, "payload")?;
        let raw: Map<String, Value> = decode_segment(self.payload, "payload")?;
        token.claims = strip_registered_claims(raw);
        Ok(token)
    }

    /// Decode the signature bytes
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Decode`] on bad base64.
    pub fn signature(&self) -> Result<Vec<u8>> {
        decode_base64(self.signature, "signature")
    }

    /// The bytes covered by the signature: `header.payload`
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

fn decode_base64(segment: &str, name: &'static str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| VerifyError::Decode {
            segment: name,
            reason: e.to_string(),
        })
}

/// Decode one base64 JSON segment into `T`
///
/// # Errors
///
/// Returns [`VerifyError::Decode`] on bad base64 or JSON.
pub fn decode_segment<T: DeserializeOwned>(segment: &str, name: &'static str) -> Result<T> {
    let bytes = decode_base64(segment, name)?;
    serde_json::from_slice(&bytes).map_err(|e| VerifyError::Decode {
        segment: name,
        reason: e.to_string(),
    })
}
