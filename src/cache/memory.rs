//! In-process cache store.

use crate::cache::store::{CacheStore, Record};
use crate::clock::{Clock, SystemClock};
use crate::LicensingError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    record: Record,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory cache store.
///
/// By default entries expire natively after their TTL. A store built with
/// [`MemoryStore::without_expiry`] keeps entries until deleted, like cache
/// backends that do not enforce expiry themselves.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    native_expiry: bool,
}

impl MemoryStore {
    /// Create a store that honours TTLs, using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), true)
    }

    /// Create a store that ignores TTLs.
    pub fn without_expiry() -> Self {
        Self::with_clock(Arc::new(SystemClock), false)
    }

    /// Create a store with a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>, native_expiry: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            native_expiry,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now_utc();
        self.entries
            .read()
            .values()
            .filter(|entry| is_live(entry, now))
            .count()
    }

    /// Whether the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_live(entry: &Entry, now: DateTime<Utc>) -> bool {
    entry.expires_at.is_none_or(|expires_at| expires_at > now)
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Record>, LicensingError> {
        let now = self.clock.now_utc();
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|entry| is_live(entry, now))
            .map(|entry| entry.record.clone()))
    }

    fn write(&self, key: &str, record: &Record, ttl: Duration) -> Result<(), LicensingError> {
        let expires_at = if self.native_expiry {
            // TTLs beyond chrono's range never expire
            let now = self.clock.now_utc();
            let expires_at = chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            Some(expires_at)
        } else {
            None
        };

        self.entries.write().insert(
            key.to_string(),
            Entry {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), LicensingError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
