//! File-based cache store with atomic writes.
//!
//! Stores records under `dirs::data_dir()/<namespace>/`, one JSON file per
//! key. Uses temp file + rename for atomic writes.
//!
//! Files carry no expiry metadata: TTLs are ignored and stale verdicts are
//! purged by the manager's staleness guard.

use crate::cache::store::{CacheStore, Record};
use crate::LicensingError;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-based cache store.
pub struct FileStore {
    /// Directory for cache files.
    cache_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store with the given namespace.
    ///
    /// Cache files are stored under `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, LicensingError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| LicensingError::CacheIO("Could not find data directory".to_string()))?;

        Self::with_path(base_dir.join(namespace))
    }

    /// Create a file store at a specific directory.
    pub fn with_path(cache_dir: PathBuf) -> Result<Self, LicensingError> {
        fs::create_dir_all(&cache_dir)
            .map_err(|e| LicensingError::CacheIO(format!("Failed to create cache dir: {}", e)))?;
        Ok(Self { cache_dir })
    }

    /// Directory holding the cache files.
    pub fn dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Get the path for a key's cache file.
    fn record_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", safe_file_name(key)))
    }
}

/// Map a cache key onto a file name that cannot escape the cache directory.
fn safe_file_name(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

impl CacheStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Record>, LicensingError> {
        let path = self.record_path(key);

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LicensingError::CacheIO(format!(
                    "Failed to read cache file: {}",
                    e
                )))
            }
        };

        let record: Record = serde_json::from_str(&json)
            .map_err(|e| LicensingError::CacheFormat(format!("Failed to deserialize cache: {}", e)))?;
        Ok(Some(record))
    }

    fn write(&self, key: &str, record: &Record, _ttl: Duration) -> Result<(), LicensingError> {
        let target_path = self.record_path(key);
        let temp_path = self.cache_dir.join(format!(
            "{}.{}-{}.tmp",
            safe_file_name(key),
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| LicensingError::CacheFormat(format!("Failed to serialize cache: {}", e)))?;

        // Write to temp file
        fs::write(&temp_path, &json)
            .map_err(|e| LicensingError::CacheIO(format!("Failed to write temp file: {}", e)))?;

        // Atomic rename
        if let Err(e) = fs::rename(&temp_path, &target_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(LicensingError::CacheIO(format!(
                "Failed to rename cache file: {}",
                e
            )));
        }

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), LicensingError> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LicensingError::CacheIO(format!(
                "Failed to delete cache: {}",
                e
            ))),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, LicensingError> {
        Ok(self.record_path(key).is_file())
    }
}
