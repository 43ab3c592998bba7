//! License Manager - the main public API for hqcheck.
//!
//! The `LicenseManager` owns the verdict cache key and the
//! read/write/clear protocol around the shared cache store:
//! - Cached verdicts are served until their TTL runs out
//! - Expired verdicts are purged even when the store lacks native expiry
//! - Remote failures are cached as fail-open verdicts with a short TTL

use crate::cache::key::cache_key;
use crate::cache::store::CacheStore;
use crate::client::http::HqClient;
use crate::client::outcome::{RequestOutcome, Transport};
use crate::client::stub::StaticTransport;
use crate::clock::{Clock, SystemClock};
use crate::config::LicensingConfig;
use crate::protocol::models::CachedVerdict;
use crate::protocol::normalize::normalize;
use crate::protocol::payload::{
    MetadataSource, RequestContext, SystemMetadata, VerificationPayload,
};
use crate::LicensingError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Main license manager for hqcheck.
///
/// Create one instance per application and reuse it for all license checks.
/// Bind inbound request details with [`LicenseManager::with_request`].
#[derive(Clone)]
pub struct LicenseManager {
    config: LicensingConfig,
    cache_key: String,
    clock: Arc<dyn Clock>,
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    metadata: Arc<dyn MetadataSource>,
    request: Option<RequestContext>,
}

impl LicenseManager {
    /// Create a new license manager with the given configuration and store.
    ///
    /// Uses the HTTP client, except in the test environment where a canned
    /// "licensed" answer is returned without network access.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - HTTP client creation fails
    pub fn new(
        config: LicensingConfig,
        store: Arc<dyn CacheStore>,
    ) -> Result<Self, LicensingError> {
        config.validate()?;
        let transport: Arc<dyn Transport> = if config.is_test_environment() {
            Arc::new(StaticTransport::licensed())
        } else {
            Arc::new(HqClient::new(&config)?)
        };
        Self::with_parts(config, store, transport, Arc::new(SystemClock))
    }

    /// Create a license manager with a custom transport.
    pub fn with_transport(
        config: LicensingConfig,
        store: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, LicensingError> {
        config.validate()?;
        Self::with_parts(config, store, transport, Arc::new(SystemClock))
    }

    /// Create a license manager with a custom transport and clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_clock(
        config: LicensingConfig,
        store: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LicensingError> {
        config.validate()?;
        Self::with_parts(config, store, transport, clock)
    }

    fn with_parts(
        config: LicensingConfig,
        store: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LicensingError> {
        Ok(Self {
            cache_key: cache_key(&config.product_version),
            config,
            clock,
            store,
            transport,
            metadata: Arc::new(SystemMetadata),
            request: None,
        })
    }

    /// Replace the diagnostic metadata source.
    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataSource>) -> Self {
        self.metadata = metadata;
        self
    }

    /// A manager sharing this one's store and transport, bound to an
    /// inbound request.
    pub fn with_request(&self, request: RequestContext) -> Self {
        let mut manager = self.clone();
        manager.request = Some(request);
        manager
    }

    /// Return the cached verdict, or verify remotely and cache the result.
    ///
    /// Never fails. When the licensing service cannot be reached or gives
    /// an unusable answer, the returned verdict is valid and carries the
    /// failure in its `error` fields.
    pub fn check(&self) -> CachedVerdict {
        self.expire_if_overdue();

        if let Some(verdict) = self.cached_if_present() {
            debug!(key = %self.cache_key, valid = verdict.valid, "license verdict cache hit");
            return verdict;
        }

        self.fetch_and_cache()
    }

    /// Whether the installation is licensed.
    pub fn is_licensed(&self) -> bool {
        self.check().valid
    }

    /// Drop any cached verdict and verify remotely.
    pub fn force_refresh(&self) -> CachedVerdict {
        if let Err(e) = self.clear() {
            warn!(key = %self.cache_key, error = %e, "failed to clear license verdict");
        }

        self.fetch_and_cache()
    }

    /// Delete the cached verdict for the current product version.
    pub fn clear(&self) -> Result<(), LicensingError> {
        self.store.delete(&self.cache_key)
    }

    /// Read the cached verdict without side effects.
    pub fn current_cached_verdict(&self) -> Option<CachedVerdict> {
        let record = match self.store.read(&self.cache_key) {
            Ok(record) => record?,
            Err(e) => {
                warn!(key = %self.cache_key, error = %e, "failed to read license verdict");
                return None;
            }
        };

        match CachedVerdict::from_record(record) {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                warn!(key = %self.cache_key, error = %e, "undecodable license verdict");
                None
            }
        }
    }

    /// The cache key derived from the product version.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LicensingConfig {
        &self.config
    }

    /// Purge a cached verdict whose TTL has run out, or that cannot be
    /// decoded.
    fn expire_if_overdue(&self) {
        let overdue = match self.store.read(&self.cache_key) {
            Ok(Some(record)) => match CachedVerdict::from_record(record) {
                Ok(verdict) => verdict.is_stale(self.clock.now_utc()),
                Err(e) => {
                    warn!(key = %self.cache_key, error = %e, "purging undecodable license verdict");
                    true
                }
            },
            Ok(None) => false,
            Err(e @ LicensingError::CacheFormat(_)) => {
                warn!(key = %self.cache_key, error = %e, "purging undecodable license verdict");
                true
            }
            Err(e) => {
                warn!(key = %self.cache_key, error = %e, "failed to read license verdict");
                false
            }
        };

        if overdue {
            debug!(key = %self.cache_key, "purging expired license verdict");
            if let Err(e) = self.clear() {
                warn!(key = %self.cache_key, error = %e, "failed to purge license verdict");
            }
        }
    }

    fn cached_if_present(&self) -> Option<CachedVerdict> {
        match self.store.exists(&self.cache_key) {
            Ok(true) => self.current_cached_verdict(),
            Ok(false) => None,
            Err(e) => {
                warn!(key = %self.cache_key, error = %e, "failed to probe license verdict");
                None
            }
        }
    }

    fn fetch_and_cache(&self) -> CachedVerdict {
        let payload =
            VerificationPayload::build(&self.config, self.request.as_ref(), self.metadata.as_ref());
        let outcome = self.transport.execute(&payload);
        self.cache_outcome(outcome, payload)
    }

    fn cache_outcome(&self, outcome: RequestOutcome, payload: VerificationPayload) -> CachedVerdict {
        let ttl = outcome.ttl(&self.config);
        let now = self.clock.now_utc();

        let verdict = match outcome {
            RequestOutcome::Success { body, .. } => {
                CachedVerdict::from_response(normalize(&body), ttl, payload, now)
            }
            RequestOutcome::Failure { category, message } => {
                warn!(%category, message = %message, "license check failed open");
                CachedVerdict::fail_open(
                    self.config.license.clone(),
                    category.code(),
                    category.label(),
                    message,
                    ttl,
                    payload,
                    now,
                )
            }
        };

        match verdict.to_record() {
            Ok(record) => {
                if let Err(e) = self.store.write(&self.cache_key, &record, ttl) {
                    warn!(key = %self.cache_key, error = %e, "failed to cache license verdict");
                } else {
                    info!(
                        key = %self.cache_key,
                        valid = verdict.valid,
                        ttl_secs = ttl.as_secs(),
                        "cached license verdict"
                    );
                }
            }
            Err(e) => {
                warn!(key = %self.cache_key, error = %e, "failed to encode license verdict");
            }
        }

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryStore;
    use crate::cache::store::Record;
    use crate::client::outcome::FailureCategory;
    use crate::clock::MockClock;
    use serde_json::{json, Value};
    use std::time::Duration;

    const SIX_HOURS: Duration = Duration::from_secs(6 * 60 * 60);
    const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

    fn test_config() -> LicensingConfig {
        let mut config = LicensingConfig::new(
            Some("pro".to_string()),
            Some("key-123".to_string()),
            "3.2.1",
            "production",
        );
        config.app_name = Some("dashboard".to_string());
        config
    }

    struct Harness {
        clock: Arc<MockClock>,
        store: Arc<MemoryStore>,
        transport: Arc<StaticTransport>,
        manager: LicenseManager,
    }

    fn harness(outcome: RequestOutcome, native_expiry: bool) -> Harness {
        let clock = Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let store = Arc::new(MemoryStore::with_clock(clock.clone(), native_expiry));
        let transport = Arc::new(StaticTransport::new(outcome));
        let manager = LicenseManager::new_with_clock(
            test_config(),
            store.clone(),
            transport.clone(),
            clock.clone(),
        )
        .unwrap();

        Harness {
            clock,
            store,
            transport,
            manager,
        }
    }

    fn licensed() -> RequestOutcome {
        RequestOutcome::Success {
            status: 200,
            body: br#"{"id":"pro","valid":true}"#.to_vec(),
        }
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn read(&self, _key: &str) -> Result<Option<Record>, LicensingError> {
            Err(LicensingError::CacheIO("read failed".to_string()))
        }
        fn write(&self, _: &str, _: &Record, _: Duration) -> Result<(), LicensingError> {
            Err(LicensingError::CacheIO("write failed".to_string()))
        }
        fn delete(&self, _key: &str) -> Result<(), LicensingError> {
            Err(LicensingError::CacheIO("delete failed".to_string()))
        }
    }

    /// Store holding a record it cannot decode, and refusing writes.
    #[derive(Default)]
    struct CorruptStore {
        deleted: parking_lot::Mutex<bool>,
    }

    impl CacheStore for CorruptStore {
        fn read(&self, _key: &str) -> Result<Option<Record>, LicensingError> {
            if *self.deleted.lock() {
                Ok(None)
            } else {
                Err(LicensingError::CacheFormat("truncated record".to_string()))
            }
        }
        fn write(&self, _: &str, _: &Record, _: Duration) -> Result<(), LicensingError> {
            Err(LicensingError::CacheIO("disk full".to_string()))
        }
        fn delete(&self, _key: &str) -> Result<(), LicensingError> {
            *self.deleted.lock() = true;
            Ok(())
        }
    }

    struct FailingMetadata;

    impl MetadataSource for FailingMetadata {
        fn collect(&self) -> Result<Value, LicensingError> {
            Err(LicensingError::Metadata("boom".to_string()))
        }
    }

    #[test]
    fn test_license_manager_creation() {
        let manager = LicenseManager::new(test_config(), Arc::new(MemoryStore::new()));
        assert!(manager.is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = test_config();
        config.product_version = String::new();
        let result = LicenseManager::new(config, Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(LicensingError::ConfigError(_))));
    }

    #[test]
    fn test_cache_key_accessor() {
        let h = harness(licensed(), true);
        assert_eq!(h.manager.cache_key(), "hqcheck.hq-3-2-1.response");
        assert_eq!(h.manager.config().product_version, "3.2.1");
    }

    #[test]
    fn test_success_is_cached_with_long_ttl() {
        let h = harness(licensed(), true);

        let verdict = h.manager.check();

        assert!(verdict.valid);
        assert_eq!(verdict.id.as_deref(), Some("pro"));
        assert!(verdict.error.is_none());
        assert_eq!(verdict.ttl(), SIX_HOURS);
        assert_eq!(verdict.fetched_at, h.clock.now_utc());
        assert_eq!(verdict.payload.license_key.as_deref(), Some("key-123"));
        assert_eq!(h.transport.calls(), 1);
        assert_eq!(h.manager.current_cached_verdict(), Some(verdict));
    }

    #[test]
    fn test_remote_invalid_verdict_is_respected() {
        let h = harness(
            RequestOutcome::Success {
                status: 200,
                body: br#"{"id":"pro","valid":false}"#.to_vec(),
            },
            true,
        );

        assert!(!h.manager.is_licensed());
        assert_eq!(
            h.manager.current_cached_verdict().unwrap().ttl(),
            SIX_HOURS
        );
    }

    #[test]
    fn test_fresh_cache_hit_skips_network() {
        let h = harness(licensed(), true);
        let first = h.manager.check();

        h.clock.advance(chrono::Duration::minutes(1));
        let second = h.manager.check();

        assert_eq!(first, second);
        assert_eq!(h.transport.calls(), 1);
    }

    #[test]
    fn test_staleness_guard_purges_without_native_expiry() {
        let h = harness(licensed(), false);
        let first = h.manager.check();

        h.clock.advance(chrono::Duration::hours(7));
        // The store alone would still serve the old verdict
        assert!(h.store.exists(h.manager.cache_key()).unwrap());

        let second = h.manager.check();

        assert_eq!(h.transport.calls(), 2);
        assert!(second.fetched_at > first.fetched_at);
        assert_eq!(second.fetched_at, h.clock.now_utc());
    }

    #[test]
    fn test_native_expiry_also_refetches() {
        let h = harness(licensed(), true);
        h.manager.check();

        h.clock.advance(chrono::Duration::hours(7));
        h.manager.check();

        assert_eq!(h.transport.calls(), 2);
    }

    #[test]
    fn test_every_failure_fails_open_with_short_ttl() {
        for category in FailureCategory::ALL {
            let h = harness(RequestOutcome::failure(category, "underlying detail"), true);

            let verdict = h.manager.check();

            assert!(verdict.valid, "{:?} must fail open", category);
            assert_eq!(verdict.ttl(), FIVE_MINUTES);
            assert_eq!(verdict.id.as_deref(), Some("pro"));
            assert_eq!(verdict.error.as_deref(), Some(category.label()));
            assert_eq!(verdict.error_code.as_deref(), Some(category.code()));
            assert_eq!(
                verdict.exception_message.as_deref(),
                Some("underlying detail")
            );
            assert_eq!(h.manager.current_cached_verdict(), Some(verdict));
        }
    }

    #[test]
    fn test_connection_refused_retries_after_short_ttl() {
        let h = harness(
            RequestOutcome::failure(FailureCategory::ConnectionRefused, "Connection refused"),
            false,
        );

        let verdict = h.manager.check();
        assert!(verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("HTTP connection refused error."));

        h.clock.advance(chrono::Duration::minutes(4));
        h.manager.check();
        assert_eq!(h.transport.calls(), 1);

        h.clock.advance(chrono::Duration::minutes(2));
        h.manager.check();
        assert_eq!(h.transport.calls(), 2);
    }

    #[test]
    fn test_clear_then_check_refetches() {
        let h = harness(licensed(), true);
        h.manager.check();

        h.manager.clear().unwrap();
        assert!(h.manager.current_cached_verdict().is_none());

        h.manager.check();
        assert_eq!(h.transport.calls(), 2);
    }

    #[test]
    fn test_clear_when_absent_is_ok() {
        let h = harness(licensed(), true);
        assert!(h.manager.clear().is_ok());
        assert!(h.manager.current_cached_verdict().is_none());
    }

    #[test]
    fn test_force_refresh_bypasses_fresh_cache() {
        let h = harness(licensed(), true);
        h.manager.check();

        h.clock.advance(chrono::Duration::minutes(1));
        let refreshed = h.manager.force_refresh();

        assert_eq!(h.transport.calls(), 2);
        assert_eq!(refreshed.fetched_at, h.clock.now_utc());
        assert_eq!(h.manager.current_cached_verdict(), Some(refreshed));
    }

    #[test]
    fn test_non_mapping_body_is_normalized() {
        let h = harness(
            RequestOutcome::Success {
                status: 200,
                body: b"\"all good\"".to_vec(),
            },
            true,
        );

        let verdict = h.manager.check();

        assert_eq!(verdict.response["normalized_response"], json!("all good"));
        assert!(!verdict.valid);
        assert_eq!(verdict.ttl(), SIX_HOURS);
    }

    #[test]
    fn test_undecodable_record_is_purged() {
        let h = harness(licensed(), true);
        let garbage = json!({ "valid": "maybe" }).as_object().cloned().unwrap();
        h.store
            .write(h.manager.cache_key(), &garbage, SIX_HOURS)
            .unwrap();

        assert!(h.manager.current_cached_verdict().is_none());

        let verdict = h.manager.check();
        assert!(verdict.valid);
        assert_eq!(h.transport.calls(), 1);
    }

    #[test]
    fn test_unreadable_record_is_purged_even_if_write_fails() {
        let store = Arc::new(CorruptStore::default());
        let manager = LicenseManager::with_transport(
            test_config(),
            store.clone(),
            Arc::new(StaticTransport::licensed()),
        )
        .unwrap();

        assert!(manager.check().valid);
        assert!(*store.deleted.lock());
    }

    #[test]
    fn test_huge_ttl_does_not_panic() {
        let clock = Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let mut config = test_config();
        config.cache_ttl = Duration::from_secs(1_000_000 * 365 * 24 * 60 * 60);
        assert!(config.validate().is_ok());

        let transport = Arc::new(StaticTransport::licensed());
        let manager = LicenseManager::new_with_clock(
            config,
            Arc::new(MemoryStore::with_clock(clock.clone(), true)),
            transport.clone(),
            clock.clone(),
        )
        .unwrap();

        assert!(manager.check().valid);
        clock.advance(chrono::Duration::days(365 * 100));
        assert!(manager.check().valid);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_version_upgrade_uses_new_key() {
        let h = harness(licensed(), true);
        h.manager.check();

        let mut config = test_config();
        config.product_version = "3.3.0".to_string();
        let upgraded = LicenseManager::new_with_clock(
            config,
            h.store.clone(),
            h.transport.clone(),
            h.clock.clone(),
        )
        .unwrap();

        assert!(upgraded.current_cached_verdict().is_none());
        upgraded.check();
        assert_eq!(h.transport.calls(), 2);
        assert_eq!(h.store.len(), 2);
    }

    #[test]
    fn test_broken_store_still_returns_verdict() {
        let transport = Arc::new(StaticTransport::licensed());
        let manager =
            LicenseManager::with_transport(test_config(), Arc::new(BrokenStore), transport.clone())
                .unwrap();

        assert!(manager.check().valid);
        assert!(manager.force_refresh().valid);
        assert!(manager.current_cached_verdict().is_none());
        assert!(matches!(manager.clear(), Err(LicensingError::CacheIO(_))));
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn test_request_context_is_echoed() {
        let h = harness(licensed(), true);
        let bound = h.manager.with_request(RequestContext {
            ip: Some("10.0.0.7".to_string()),
            host: Some("admin.example.com".to_string()),
            port: Some(8443),
        });

        let verdict = bound.check();

        assert_eq!(verdict.payload.ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(verdict.payload.port, Some(8443));
        // The unbound manager shares the same cache entry
        assert_eq!(h.manager.current_cached_verdict(), Some(verdict));
    }

    #[test]
    fn test_metadata_failure_does_not_block_licensing() {
        let h = harness(licensed(), true);
        let manager = h.manager.clone().with_metadata(Arc::new(FailingMetadata));

        let verdict = manager.check();

        assert!(verdict.valid);
        assert!(verdict.error.is_none());
        assert_eq!(
            verdict.payload.metadata["error"],
            json!("Failed to generate the metadata")
        );
    }

    #[test]
    fn test_test_environment_uses_canned_answer() {
        let mut config = test_config();
        config.environment = "test".to_string();
        config.endpoint = "http://127.0.0.1:1/unreachable".to_string();

        let manager = LicenseManager::new(config, Arc::new(MemoryStore::new())).unwrap();
        let verdict = manager.check();

        assert!(verdict.valid);
        assert!(verdict.error.is_none());
        assert_eq!(verdict.id.as_deref(), Some("pro"));
    }
}
