use std::fmt;
use thiserror::Error;

/// Operational errors raised while configuring the authenticator, decoding
/// credentials or talking to the nonce store.
///
/// These never reach the credential holder directly. Verification outcomes
/// are reported through [`crate::AuthResult`], which maps every failure to a
/// [`RejectReason`].
///
/// # Example
/// ```rust
/// use wsse_auth::{AuthError, Result};
///
/// fn handle(result: Result<()>) {
///     match result {
///         Ok(()) => println!("ok"),
///         Err(AuthError::StoreUnavailable(msg)) => println!("nonce store down: {}", msg),
///         Err(e) => println!("other error: {}", e),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum AuthError {
    /// Configuration values are missing or out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Base64 decoding failed
    ///
    /// This error occurs when the nonce or digest field contains characters
    /// outside the base64 alphabet or has incorrect padding.
    #[error("Base64 decode error: {0}")]
    Base64Error(String),

    /// The credential header could not be parsed
    ///
    /// This error occurs when:
    /// - The `UsernameToken` scheme marker is missing
    /// - One of `Username`, `PasswordDigest`, `Nonce`, `Created` is absent or repeated
    /// - An attribute is not a `key="value"` pair
    /// - `Created` is not an ISO-8601 timestamp
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    /// The nonce store could not be read or written
    ///
    /// Verification treats this as fail-closed.
    #[error("Nonce store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Why a credential was rejected.
///
/// Kept for internal logging and metrics only. Callers answering the client
/// should use [`AuthenticationFailed`] so the specific reason never leaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Malformed,
    UnknownUser,
    /// `Created` lies in the future relative to the verifier's clock
    InvalidTimestamp,
    /// `Created` is older than the validity window
    Expired,
    /// The nonce was already used inside the validity window
    ReplayDetected,
    DigestMismatch,
    /// The nonce store failed; the request is denied
    StoreUnavailable,
}

impl RejectReason {
    /// Stable label for log fields and metric dimensions.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Malformed => "malformed",
            RejectReason::UnknownUser => "unknown_user",
            RejectReason::InvalidTimestamp => "invalid_timestamp",
            RejectReason::Expired => "expired",
            RejectReason::ReplayDetected => "replay_detected",
            RejectReason::DigestMismatch => "digest_mismatch",
            RejectReason::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only failure a credential holder ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("The WSSE authentication failed.")]
pub struct AuthenticationFailed;
