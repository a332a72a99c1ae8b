//! RS256 signature verification

use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

use crate::keys::PublicKey;

/// Check an RSASSA-PKCS1-v1_5 SHA-256 signature over `message` with `key`
///
/// Any failure, including a signature of the wrong length, means "this key
/// does not match"; the caller simply moves on to the next candidate.
pub fn verify_rs256(message: &[u8], signature: &[u8], key: &PublicKey) -> bool {
    let digest = Sha256::digest(message);
    key.rsa()
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .is_ok()
}
