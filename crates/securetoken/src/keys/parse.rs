//! PEM certificate parsing

use rsa::{BigUint, RsaPublicKey};
use std::collections::BTreeMap;
use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey as SubjectKey;

use super::PublicKey;
use crate::error::{Result, VerifyError};

/// Parse a PEM-encoded X.509 certificate and extract its RSA public key
///
/// # Errors
///
/// Returns [`VerifyError::KeyParse`] if the input has no PEM block, the block is
/// not a certificate, or the certificate key is not RSA.
pub fn parse_public_key(kid: &str, pem: &[u8]) -> Result<PublicKey> {
    let (_, block) = parse_x509_pem(pem).map_err(|e| {
        VerifyError::KeyParse(format!(
            "failed to decode the certificate for key '{kid}' as PEM: {e}"
        ))
    })?;

    let cert = block.parse_x509().map_err(|e| {
        VerifyError::KeyParse(format!("invalid certificate for key '{kid}': {e}"))
    })?;

    let parsed = cert.public_key().parsed().map_err(|e| {
        VerifyError::KeyParse(format!("invalid public key for key '{kid}': {e}"))
    })?;

    let SubjectKey::RSA(rsa_key) = parsed else {
        return Err(VerifyError::KeyParse(format!(
            "certificate for key '{kid}' is not an RSA key"
        )));
    };

    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(rsa_key.modulus),
        BigUint::from_bytes_be(rsa_key.exponent),
    )
    .map_err(|e| VerifyError::KeyParse(format!("unusable RSA key '{kid}': {e}")))?;

    Ok(PublicKey::new(kid, key))
}

/// Parse a key-distribution response body: a JSON object of `{kid: PEM}`
///
/// One bad entry fails the whole set.
///
/// # Errors
///
/// Returns [`VerifyError::KeyParse`] on invalid JSON or any unparsable certificate.
pub fn parse_key_set(body: &[u8]) -> Result<Vec<PublicKey>> {
    let entries: BTreeMap<String, String> = serde_json::from_slice(body)
        .map_err(|e| VerifyError::KeyParse(format!("invalid key set JSON: {e}")))?;

    entries
        .iter()
        .map(|(kid, pem)| parse_public_key(kid, pem.as_bytes()))
        .collect()
}
