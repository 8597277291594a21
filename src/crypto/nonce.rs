use crate::error::{AuthError, Result};
use base64::prelude::*;
use rand::{rngs::OsRng, RngCore};

/// Number of random bytes behind each generated nonce
pub const NONCE_BYTES: usize = 16;

/// Generate a cryptographically secure random nonce
///
/// Returns 16 random bytes as a 32 character lowercase hex string. The
/// result only uses `[0-9a-f]`, so it is safe as a file or key name, and it
/// is also valid base64 (32 characters, no padding needed), which is how the
/// digest consumes it.
///
/// # Example
/// ```rust
/// use wsse_auth::crypto::nonce::generate_nonce;
///
/// let nonce = generate_nonce();
/// assert_eq!(nonce.len(), 32);
/// ```
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Decode the wire form of a nonce into the raw bytes fed to the digest
///
/// # Errors
/// * `Base64Error` - If the nonce is not valid standard base64
pub fn decode_nonce(nonce_b64: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(nonce_b64)
        .map_err(|e| AuthError::Base64Error(format!("Failed to decode nonce: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_nonce() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();

        assert_ne!(nonce1, nonce2);
        assert_eq!(nonce1.len(), NONCE_BYTES * 2);
        assert!(nonce1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_nonces_are_unique() {
        let nonces: HashSet<String> = (0..1000).map(|_| generate_nonce()).collect();
        assert_eq!(nonces.len(), 1000);
    }

    #[test]
    fn test_generated_nonce_is_decodable() {
        let decoded = decode_nonce(&generate_nonce()).unwrap();
        assert_eq!(decoded.len(), 24);
    }

    #[test]
    fn test_decode_invalid_nonce() {
        let result = decode_nonce("not base64!");
        assert!(matches!(result, Err(AuthError::Base64Error(_))));
    }
}
