use super::{is_live, NonceCheck, NonceLedger};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// Sweep lapsed records once every this many inserts
const SWEEP_EVERY: u64 = 1000;

/// In-process nonce ledger
///
/// Suited to tests and single-process deployments. Records are lost on
/// restart, which widens the replay window to "since the last restart".
///
/// The DashMap entry API locks only the shard holding the nonce, so the
/// check and the insert happen under one critical section per key.
#[derive(Debug, Default)]
pub struct MemoryNonceLedger {
    /// nonce -> first seen
    records: DashMap<String, DateTime<Utc>>,
    insert_counter: AtomicU64,
}

impl MemoryNonceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, lapsed ones included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl NonceLedger for MemoryNonceLedger {
    fn check_and_record(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<NonceCheck> {
        let outcome = match self.records.entry(nonce.to_string()) {
            Entry::Occupied(mut entry) => {
                if is_live(*entry.get(), now, window) {
                    NonceCheck::AlreadyUsed
                } else {
                    entry.insert(now);
                    NonceCheck::Accepted
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                NonceCheck::Accepted
            }
        };

        // Entry guard is released; sweeping now cannot deadlock on the shard
        if outcome == NonceCheck::Accepted {
            let count = self.insert_counter.fetch_add(1, Ordering::Relaxed) + 1;
            if count % SWEEP_EVERY == 0 {
                self.purge_expired(now, window)?;
            }
        }

        Ok(outcome)
    }

    fn purge_expired(&self, now: DateTime<Utc>, window: Duration) -> Result<usize> {
        let before = self.records.len();
        self.records
            .retain(|_, first_seen| is_live(*first_seen, now, window));
        Ok(before.saturating_sub(self.records.len()))
    }
}
