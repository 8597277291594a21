use crate::{crypto::nonce::decode_nonce, error::Result};
use base64::prelude::*;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Compute the WSSE password digest
///
/// `base64(SHA-1(nonce_bytes ‖ created ‖ secret))`, where `created` is the
/// exact timestamp string carried on the wire.
///
/// # Arguments
/// * `nonce_bytes` - Raw nonce bytes (the base64-decoded `Nonce` field)
/// * `created` - ISO-8601 `Created` string, byte for byte as transmitted
/// * `secret` - Plaintext shared secret
///
/// # Example
/// ```rust
/// use wsse_auth::crypto::digest::compute_digest;
///
/// let digest = compute_digest(b"0123456789abcdef", "2003-12-15T14:43:07Z", "taadtaadpstcsm");
/// assert_eq!(digest, "olSClbh8kEiYF23jfXBQobBgbeg=");
/// ```
pub fn compute_digest(nonce_bytes: &[u8], created: &str, secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce_bytes);
    hasher.update(created.as_bytes());
    hasher.update(secret.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// Compute the digest from the base64 wire form of the nonce (convenience function)
///
/// # Errors
/// * `Base64Error` - If the nonce is not valid base64
pub fn compute_digest_b64(nonce_b64: &str, created: &str, secret: &str) -> Result<String> {
    let nonce_bytes = decode_nonce(nonce_b64)?;
    Ok(compute_digest(&nonce_bytes, created, secret))
}

/// Compare a received digest with the expected one
///
/// Byte-for-byte equality of the base64 strings. Anything that does not
/// match, including garbage that is not base64 at all, is simply `false`.
pub fn compare_digest(received: &str, expected: &str) -> bool {
    received.as_bytes().ct_eq(expected.as_bytes()).into()
}
