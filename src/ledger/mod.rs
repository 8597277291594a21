//! Replay protection: the record of nonces consumed inside the validity window.

pub mod file;
pub mod memory;

use crate::error::Result;
use chrono::{DateTime, Duration, Utc};

/// Outcome of [`NonceLedger::check_and_record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceCheck {
    /// The nonce was unseen (or its record had lapsed) and is now recorded
    Accepted,
    /// The nonce was already recorded inside the window; nothing was changed
    AlreadyUsed,
}

/// Storage for consumed nonces.
///
/// # Thread Safety
///
/// Uses `&self` so one ledger can serve concurrent verifications.
/// Implementations use interior mutability.
///
/// # Atomicity
///
/// `check_and_record` **MUST be atomic** per nonce: two callers presenting
/// the same nonce at the same time must never both see `Accepted`. Hold a
/// lock across the check and the write, or use a compare-and-swap primitive
/// of the backing store.
///
/// # Lapsed records
///
/// A record whose `first_seen + window` is before `now` counts as absent.
/// Physically removing it can wait for [`NonceLedger::purge_expired`].
pub trait NonceLedger: Send + Sync {
    /// Check whether `nonce` is live and record it if not.
    ///
    /// # Errors
    /// * `StoreUnavailable` - The backing store failed; callers must deny
    fn check_and_record(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<NonceCheck>;

    /// Drop records that lapsed before `now`, returning how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>, window: Duration) -> Result<usize>;
}

/// Whether a record first seen at `first_seen` still blocks reuse at `now`
pub(crate) fn is_live(first_seen: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    first_seen + window >= now
}
