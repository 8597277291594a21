use super::{is_live, NonceCheck, NonceLedger};
use crate::error::{AuthError, Result};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::SystemTime,
};

/// Number of lock stripes guarding record files inside this process
const LOCK_STRIPES: usize = 64;

/// Directory-backed nonce ledger
///
/// One file per nonce, holding the Unix second at which it was first seen.
/// File names are the hex SHA-256 of the nonce, so arbitrary client nonces
/// (base64 with `/` and `+`) never reach the filesystem as paths.
///
/// Within the process a striped lock serializes callers hashing to the same
/// stripe. Across processes sharing the directory, the first record for a
/// nonce is created with `create_new`, so only one writer can win.
///
/// Renewing a lapsed record is only serialized inside one process: two
/// processes sharing the directory may both accept a nonce whose record has
/// lapsed. The renewed record is swapped in with a rename, so readers never
/// see a half-written file.
#[derive(Debug)]
pub struct FileNonceLedger {
    dir: PathBuf,
    locks: [Mutex<()>; LOCK_STRIPES],
}

impl FileNonceLedger {
    /// Open (and create if needed) a ledger directory
    ///
    /// # Errors
    /// * `StoreUnavailable` - The directory cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| unavailable(&dir, e))?;
        Ok(Self {
            dir,
            locks: std::array::from_fn(|_| Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_key(nonce: &str) -> (usize, String) {
        let hash = Sha256::digest(nonce.as_bytes());
        (hash[0] as usize % LOCK_STRIPES, hex::encode(hash))
    }

    fn lock(&self, stripe: usize) -> MutexGuard<'_, ()> {
        match self.locks[stripe].lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn create_record(&self, path: &Path, now: DateTime<Utc>) -> Result<NonceCheck> {
        let file = OpenOptions::new().write(true).create_new(true).open(path);
        match file {
            Ok(mut file) => {
                file.write_all(now.timestamp().to_string().as_bytes())
                    .map_err(|e| unavailable(path, e))?;
                Ok(NonceCheck::Accepted)
            }
            // Another process recorded it first
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(NonceCheck::AlreadyUsed),
            Err(e) => Err(unavailable(path, e)),
        }
    }
}

impl NonceLedger for FileNonceLedger {
    fn check_and_record(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<NonceCheck> {
        let (stripe, file_name) = Self::record_key(nonce);
        let path = self.dir.join(file_name);
        let _guard = self.lock(stripe);

        match fs::read_to_string(&path) {
            Ok(contents) => match parse_record(&contents) {
                Some(first_seen) if !is_live(first_seen, now, window) => {
                    replace_record(&path, now)?;
                    Ok(NonceCheck::Accepted)
                }
                // Live, or still being written by another process
                _ => Ok(NonceCheck::AlreadyUsed),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.create_record(&path, now),
            Err(e) => Err(unavailable(&path, e)),
        }
    }

    fn purge_expired(&self, now: DateTime<Utc>, window: Duration) -> Result<usize> {
        let entries = fs::read_dir(&self.dir).map_err(|e| unavailable(&self.dir, e))?;
        let mut removed = 0;

        for entry in entries {
            let entry = entry.map_err(|e| unavailable(&self.dir, e))?;
            let path = entry.path();
            let Some(stripe) = stripe_of(&path) else {
                continue;
            };

            let _guard = self.lock(stripe);
            let first_seen = match fs::read_to_string(&path) {
                Ok(contents) => parse_record(&contents).or_else(|| modified_at(&path)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(unavailable(&path, e)),
            };

            if let Some(first_seen) = first_seen {
                if !is_live(first_seen, now, window) {
                    match fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(unavailable(&path, e)),
                    }
                }
            }
        }

        Ok(removed)
    }
}

/// Write the renewed record next to the old one and rename it into place
fn replace_record(path: &Path, now: DateTime<Utc>) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, now.timestamp().to_string()).map_err(|e| unavailable(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        unavailable(path, e)
    })
}

fn parse_record(contents: &str) -> Option<DateTime<Utc>> {
    let seconds = contents.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(seconds, 0)
}

/// Stripe for a record file, or `None` for files this ledger did not write
fn stripe_of(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_str()?;
    let bytes = hex::decode(name).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    Some(bytes[0] as usize % LOCK_STRIPES)
}

fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let modified: SystemTime = fs::metadata(path).ok()?.modified().ok()?;
    Some(modified.into())
}

fn unavailable(path: &Path, e: io::Error) -> AuthError {
    AuthError::StoreUnavailable(format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::{sync::Arc, thread};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn window() -> Duration {
        Duration::seconds(300)
    }

    #[test]
    fn test_replay_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = FileNonceLedger::open(tmp.path()).unwrap();

        assert_eq!(
            ledger.check_and_record("n1", t0(), window()).unwrap(),
            NonceCheck::Accepted
        );
        assert_eq!(
            ledger
                .check_and_record("n1", t0() + Duration::seconds(10), window())
                .unwrap(),
            NonceCheck::AlreadyUsed
        );
        assert_eq!(
            ledger.check_and_record("n2", t0(), window()).unwrap(),
            NonceCheck::Accepted
        );
    }

    #[test]
    fn test_lapsed_record_allows_reuse() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = FileNonceLedger::open(tmp.path()).unwrap();

        ledger.check_and_record("n1", t0(), window()).unwrap();
        assert_eq!(
            ledger
                .check_and_record("n1", t0() + Duration::seconds(300), window())
                .unwrap(),
            NonceCheck::AlreadyUsed
        );
        assert_eq!(
            ledger
                .check_and_record("n1", t0() + Duration::seconds(301), window())
                .unwrap(),
            NonceCheck::Accepted
        );
    }

    #[test]
    fn test_renewed_record_replaces_file() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = FileNonceLedger::open(tmp.path()).unwrap();
        let renewed_at = t0() + Duration::seconds(400);

        ledger.check_and_record("n1", t0(), window()).unwrap();
        ledger.check_and_record("n1", renewed_at, window()).unwrap();

        // Only the record itself remains, carrying the new first sighting
        let files: Vec<PathBuf> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(
            fs::read_to_string(&files[0]).unwrap(),
            renewed_at.timestamp().to_string()
        );
        assert_eq!(
            ledger
                .check_and_record("n1", renewed_at + Duration::seconds(300), window())
                .unwrap(),
            NonceCheck::AlreadyUsed
        );
    }

    #[test]
    fn test_records_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        FileNonceLedger::open(tmp.path())
            .unwrap()
            .check_and_record("n1", t0(), window())
            .unwrap();

        let reopened = FileNonceLedger::open(tmp.path()).unwrap();
        assert_eq!(
            reopened.check_and_record("n1", t0(), window()).unwrap(),
            NonceCheck::AlreadyUsed
        );
    }

    #[test]
    fn test_nonce_is_not_used_as_path() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = FileNonceLedger::open(tmp.path()).unwrap();

        ledger.check_and_record("a/b+c==", t0(), window()).unwrap();
        ledger.check_and_record("../escape", t0(), window()).unwrap();

        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(
            &"95c3253c7151e0d2fe4e475513e88422201682079d71d2e6f903b232ec8dd6ec".to_string()
        ));
        assert!(!tmp.path().parent().unwrap().join("escape").exists());
    }

    #[test]
    fn test_purge_expired() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = FileNonceLedger::open(tmp.path()).unwrap();
        ledger.check_and_record("old", t0(), window()).unwrap();
        ledger
            .check_and_record("new", t0() + Duration::seconds(200), window())
            .unwrap();
        fs::write(tmp.path().join("README"), "not a record").unwrap();

        let removed = ledger
            .purge_expired(t0() + Duration::seconds(350), window())
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_unreadable_directory_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = FileNonceLedger::open(tmp.path().join("nonces")).unwrap();
        fs::remove_dir(ledger.dir()).unwrap();

        let result = ledger.check_and_record("n1", t0(), window());
        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
    }

    #[test]
    fn test_concurrent_same_nonce() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = Arc::new(FileNonceLedger::open(tmp.path()).unwrap());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.check_and_record("shared", t0(), window()).unwrap())
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| *r == NonceCheck::Accepted)
            .count();
        assert_eq!(accepted, 1);
    }
}
