use crate::{
    config::WsseConfig,
    crypto::{
        digest::{compare_digest, compute_digest},
        nonce::decode_nonce,
    },
    error::{AuthenticationFailed, RejectReason, Result},
    ledger::{NonceCheck, NonceLedger},
    token::{build_credential_header, CredentialKind, UsernameToken},
    user::UserProvider,
};
use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Identity attached to a request after successful verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub roles: Vec<String>,
}

/// Outcome of verifying one credential
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated(AuthenticatedUser),
    Rejected(RejectReason),
}

impl AuthResult {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthResult::Authenticated(_))
    }

    /// Specific rejection reason, for internal logging and metrics only
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            AuthResult::Authenticated(_) => None,
            AuthResult::Rejected(reason) => Some(*reason),
        }
    }

    /// Collapse into what the credential holder may see
    ///
    /// Every rejection becomes the same [`AuthenticationFailed`].
    pub fn into_result(self) -> std::result::Result<AuthenticatedUser, AuthenticationFailed> {
        match self {
            AuthResult::Authenticated(user) => Ok(user),
            AuthResult::Rejected(_) => Err(AuthenticationFailed),
        }
    }
}

/// One strategy in a chain of authentication providers
///
/// The host asks each provider whether it [`supports`](Self::supports) the
/// presented credential and hands the header to the first one that does.
pub trait AuthenticationProvider: Send + Sync {
    fn supports(&self, kind: CredentialKind) -> bool;
    fn authenticate(&self, header: &str) -> AuthResult;
}

/// WSSE UsernameToken verifier
///
/// Verification of one credential runs strictly in this order, stopping at
/// the first failure:
/// 1. Parse the header
/// 2. Resolve the user
/// 3. Reject timestamps in the future (beyond the configured skew)
/// 4. Reject timestamps older than the validity window
/// 5. Check-and-record the nonce
/// 6. Compare the digest
///
/// A nonce is consumed at step 5 even when the digest later turns out wrong.
pub struct WsseAuthenticator<U> {
    users: U,
    ledger: Arc<dyn NonceLedger>,
    validity_window: Duration,
    clock_skew: Duration,
    /// How long a consumed nonce blocks reuse: the latest instant its
    /// credential could still pass the freshness checks
    nonce_retention: Duration,
}

impl<U: UserProvider> WsseAuthenticator<U> {
    /// Create an authenticator over an existing nonce ledger
    ///
    /// # Errors
    /// - `InvalidConfig` - The validity window is zero or out of range
    pub fn new(config: &WsseConfig, users: U, ledger: Arc<dyn NonceLedger>) -> Result<Self> {
        config.validate()?;
        let validity_window = config.validity_window()?;
        let clock_skew = config.clock_skew()?;
        Ok(Self {
            users,
            ledger,
            validity_window,
            clock_skew,
            nonce_retention: validity_window + clock_skew,
        })
    }

    /// Create an authenticator, opening the ledger named in the config
    ///
    /// # Example
    /// ```rust
    /// use std::collections::HashMap;
    /// use wsse_auth::{
    ///     build_credential_header, NonceStoreLocation, UserRecord, WsseAuthenticator, WsseConfig,
    /// };
    ///
    /// let config = WsseConfig {
    ///     validity_window_seconds: 300,
    ///     nonce_store_location: NonceStoreLocation::Memory,
    ///     clock_skew_seconds: 0,
    /// };
    /// let mut users = HashMap::new();
    /// users.insert(
    ///     "bob".to_string(),
    ///     UserRecord::new("bob", "s3cret", vec!["ROLE_API".to_string()]),
    /// );
    /// let authenticator = WsseAuthenticator::from_config(&config, users).unwrap();
    ///
    /// let header = build_credential_header("bob", "s3cret").unwrap();
    /// match authenticator.authenticate(&header).into_result() {
    ///     Ok(user) => println!("Welcome {}", user.username),
    ///     Err(e) => println!("{}", e),
    /// }
    /// ```
    pub fn from_config(config: &WsseConfig, users: U) -> Result<Self> {
        config.validate()?;
        let ledger = config.open_ledger()?;
        Self::new(config, users, ledger)
    }

    /// Verify a credential header against the current time
    ///
    /// Runs the full check sequence described on [`WsseAuthenticator`]. A
    /// nonce that passes the replay check is recorded in the ledger, so the
    /// same header is accepted at most once.
    ///
    /// # Arguments
    /// * `header` - `X-WSSE` header line or bare `UsernameToken ...` value
    ///
    /// # Returns
    /// * `AuthResult::Authenticated` - Credential is valid, carries the user's roles
    /// * `AuthResult::Rejected` - Carries the specific [`RejectReason`] for logging;
    ///   use [`AuthResult::into_result`] for what the client may see
    ///
    /// # Example
    /// ```rust
    /// use std::collections::HashMap;
    /// use wsse_auth::{NonceStoreLocation, RejectReason, UserRecord, WsseAuthenticator, WsseConfig};
    ///
    /// let config = WsseConfig {
    ///     validity_window_seconds: 300,
    ///     nonce_store_location: NonceStoreLocation::Memory,
    ///     clock_skew_seconds: 0,
    /// };
    /// let mut users = HashMap::new();
    /// users.insert("bob".to_string(), UserRecord::new("bob", "s3cret", vec![]));
    /// let authenticator = WsseAuthenticator::from_config(&config, users).unwrap();
    ///
    /// let header = authenticator.build_credential_header("bob", "s3cret").unwrap();
    /// assert!(authenticator.authenticate(&header).is_authenticated());
    ///
    /// // A captured header cannot be replayed
    /// let replay = authenticator.authenticate(&header);
    /// assert_eq!(replay.reason(), Some(RejectReason::ReplayDetected));
    /// ```
    pub fn authenticate(&self, header: &str) -> AuthResult {
        self.authenticate_at(header, Utc::now())
    }

    /// Verify a credential header as of `now`
    ///
    /// Same as [`authenticate`](Self::authenticate) with the verifier's clock
    /// supplied by the caller. Both freshness checks and the nonce ledger use
    /// `now`.
    ///
    /// # Arguments
    /// * `header` - `X-WSSE` header line or bare `UsernameToken ...` value
    /// * `now` - Verifier's current time
    ///
    /// # Returns
    /// * `AuthResult::Authenticated` - Credential is valid at `now`
    /// * `AuthResult::Rejected` - `Malformed`, `UnknownUser`, `InvalidTimestamp`,
    ///   `Expired`, `ReplayDetected`, `DigestMismatch` or `StoreUnavailable`
    pub fn authenticate_at(&self, header: &str, now: DateTime<Utc>) -> AuthResult {
        match self.verify(header, now) {
            Ok(user) => {
                info!(username = %user.username, "WSSE authentication succeeded");
                AuthResult::Authenticated(user)
            }
            Err(reason) => AuthResult::Rejected(reason),
        }
    }

    /// True only for WSSE UsernameToken credentials
    pub fn supports(&self, kind: CredentialKind) -> bool {
        kind == CredentialKind::UsernameToken
    }

    /// Build a valid `X-WSSE` header line for a client
    ///
    /// Generates a fresh nonce, timestamps it with the current UTC time and
    /// digests it with `secret`.
    ///
    /// # Arguments
    /// * `username` - User the credential is issued for
    /// * `secret` - Plaintext shared secret known to the identity store
    ///
    /// # Returns
    /// * `Ok(String)` - `X-WSSE: UsernameToken Username="...", PasswordDigest="...", Nonce="...", Created="..."`
    /// * `Err(AuthError)` - `MalformedCredential` if `username` is empty or contains `"`
    pub fn build_credential_header(&self, username: &str, secret: &str) -> Result<String> {
        build_credential_header(username, secret)
    }

    /// Remove lapsed nonce records; hosts may call this periodically
    pub fn purge_expired_nonces(&self) -> Result<usize> {
        let removed = self
            .ledger
            .purge_expired(Utc::now(), self.nonce_retention)?;
        debug!(removed, "purged expired nonces");
        Ok(removed)
    }

    fn verify(
        &self,
        header: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<AuthenticatedUser, RejectReason> {
        let token: UsernameToken = header.parse().map_err(|e| {
            debug!(error = %e, "rejecting WSSE credential: malformed");
            RejectReason::Malformed
        })?;
        let username = token.username();
        let nonce_bytes = decode_nonce(token.nonce()).map_err(|e| {
            debug!(username, error = %e, "rejecting WSSE credential: malformed nonce");
            RejectReason::Malformed
        })?;

        let user = self.users.load_user_by_username(username).ok_or_else(|| {
            debug!(username, "rejecting WSSE credential: unknown user");
            RejectReason::UnknownUser
        })?;

        let created_at = token.created_at();
        if created_at > now + self.clock_skew {
            debug!(username, created = token.created(), "rejecting WSSE credential: created in the future");
            return Err(RejectReason::InvalidTimestamp);
        }
        if now - created_at > self.validity_window {
            debug!(username, created = token.created(), "rejecting WSSE credential: expired");
            return Err(RejectReason::Expired);
        }

        match self
            .ledger
            .check_and_record(token.nonce(), now, self.nonce_retention)
        {
            Ok(NonceCheck::Accepted) => {}
            Ok(NonceCheck::AlreadyUsed) => {
                warn!(username, nonce = token.nonce(), "WSSE nonce replay detected");
                return Err(RejectReason::ReplayDetected);
            }
            Err(e) => {
                error!(username, error = %e, "nonce store unavailable, denying WSSE credential");
                return Err(RejectReason::StoreUnavailable);
            }
        }

        let expected = compute_digest(&nonce_bytes, token.created(), user.secret.expose_secret());
        if !compare_digest(token.digest(), &expected) {
            debug!(username, "rejecting WSSE credential: digest mismatch");
            return Err(RejectReason::DigestMismatch);
        }

        Ok(AuthenticatedUser {
            username: user.username,
            roles: user.roles,
        })
    }
}

impl<U: UserProvider> AuthenticationProvider for WsseAuthenticator<U> {
    fn supports(&self, kind: CredentialKind) -> bool {
        WsseAuthenticator::supports(self, kind)
    }

    fn authenticate(&self, header: &str) -> AuthResult {
        WsseAuthenticator::authenticate(self, header)
    }
}
