//! Cache store interface.
//!
//! The store is a shared, externally-owned key-value resource. Some
//! backends expire entries natively; others ignore the TTL and rely on the
//! manager's staleness guard.

use crate::LicensingError;
use serde_json::{Map, Value};
use std::time::Duration;

/// A stored record: a JSON object.
pub type Record = Map<String, Value>;

/// Key-value store holding verdict records.
///
/// Implementations must make a single-key `write` atomic with respect to a
/// concurrent `read` of the same key.
pub trait CacheStore: Send + Sync {
    /// Read the record stored under `key`.
    fn read(&self, key: &str) -> Result<Option<Record>, LicensingError>;

    /// Store `record` under `key`, replacing any previous record.
    ///
    /// `ttl` is a hint; backends without native expiry may ignore it.
    fn write(&self, key: &str, record: &Record, ttl: Duration) -> Result<(), LicensingError>;

    /// Delete the record under `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), LicensingError>;

    /// Whether a record exists under `key`.
    fn exists(&self, key: &str) -> Result<bool, LicensingError> {
        Ok(self.read(key)?.is_some())
    }
}
