use crate::{
    error::{AuthError, Result},
    ledger::{file::FileNonceLedger, memory::MemoryNonceLedger, NonceLedger},
};
use chrono::Duration;
use serde::Deserialize;
use std::{path::PathBuf, sync::Arc};

/// Where the nonce ledger keeps its records
///
/// Deserializes from a single string: `"memory"` selects the in-process map,
/// any other value is taken as a directory path.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NonceStoreLocation {
    Memory,
    Directory(PathBuf),
}

impl From<String> for NonceStoreLocation {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("memory") {
            NonceStoreLocation::Memory
        } else {
            NonceStoreLocation::Directory(PathBuf::from(value))
        }
    }
}

/// Configuration for WSSE verification
///
/// # Example
/// ```rust
/// use wsse_auth::{NonceStoreLocation, WsseConfig};
///
/// let config = WsseConfig {
///     validity_window_seconds: 300, // 5 minutes
///     nonce_store_location: NonceStoreLocation::Memory,
///     clock_skew_seconds: 0,
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct WsseConfig {
    /// Maximum age of `Created`, in seconds
    ///
    /// The same value is used as the retention period for consumed nonces,
    /// so a nonce cannot be replayed for as long as its timestamp is fresh.
    pub validity_window_seconds: u64,
    /// Backing store for consumed nonces
    pub nonce_store_location: NonceStoreLocation,
    /// How far `Created` may run ahead of the verifier's clock
    ///
    /// Defaults to 0: any timestamp in the future is rejected.
    #[serde(default)]
    pub clock_skew_seconds: u64,
}

impl WsseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.validity_window_seconds == 0 {
            return Err(AuthError::InvalidConfig(
                "validity_window_seconds must be greater than zero".to_string(),
            ));
        }
        self.validity_window()?;
        self.clock_skew()?;
        Ok(())
    }

    pub fn validity_window(&self) -> Result<Duration> {
        seconds_to_duration(self.validity_window_seconds, "validity_window_seconds")
    }

    pub fn clock_skew(&self) -> Result<Duration> {
        seconds_to_duration(self.clock_skew_seconds, "clock_skew_seconds")
    }

    /// Open the nonce ledger named by `nonce_store_location`
    ///
    /// # Errors
    /// - `StoreUnavailable` - The ledger directory cannot be created
    pub fn open_ledger(&self) -> Result<Arc<dyn NonceLedger>> {
        match &self.nonce_store_location {
            NonceStoreLocation::Memory => Ok(Arc::new(MemoryNonceLedger::new())),
            NonceStoreLocation::Directory(dir) => Ok(Arc::new(FileNonceLedger::open(dir)?)),
        }
    }
}

fn seconds_to_duration(seconds: u64, field: &str) -> Result<Duration> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| AuthError::InvalidConfig(format!("{field} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_memory_store() {
        let config: WsseConfig = serde_json::from_str(
            r#"{"validity_window_seconds": 300, "nonce_store_location": "memory"}"#,
        )
        .unwrap();

        assert_eq!(config.validity_window_seconds, 300);
        assert_eq!(config.nonce_store_location, NonceStoreLocation::Memory);
        assert_eq!(config.clock_skew_seconds, 0);
        assert_eq!(config.validity_window().unwrap(), Duration::seconds(300));
    }

    #[test]
    fn test_deserialize_directory_store() {
        let config: WsseConfig = serde_json::from_str(
            r#"{"validity_window_seconds": 60, "nonce_store_location": "/var/cache/wsse", "clock_skew_seconds": 5}"#,
        )
        .unwrap();

        assert_eq!(
            config.nonce_store_location,
            NonceStoreLocation::Directory(PathBuf::from("/var/cache/wsse"))
        );
        assert_eq!(config.clock_skew().unwrap(), Duration::seconds(5));
    }

    #[test]
    fn test_missing_window_is_rejected() {
        let result: std::result::Result<WsseConfig, _> =
            serde_json::from_str(r#"{"nonce_store_location": "memory"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_window_is_invalid() {
        let config = WsseConfig {
            validity_window_seconds: 0,
            nonce_store_location: NonceStoreLocation::Memory,
            clock_skew_seconds: 0,
        };
        assert!(matches!(config.validate(), Err(AuthError::InvalidConfig(_))));
    }

    #[test]
    fn test_huge_window_is_invalid() {
        let config = WsseConfig {
            validity_window_seconds: u64::MAX,
            nonce_store_location: NonceStoreLocation::Memory,
            clock_skew_seconds: 0,
        };
        assert!(matches!(config.validate(), Err(AuthError::InvalidConfig(_))));
    }

    #[test]
    fn test_open_directory_ledger_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("nonces");
        let config = WsseConfig {
            validity_window_seconds: 300,
            nonce_store_location: NonceStoreLocation::Directory(dir.clone()),
            clock_skew_seconds: 0,
        };

        config.open_ledger().unwrap();
        assert!(dir.is_dir());
    }
}
