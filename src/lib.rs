//! # hqcheck
//!
//! **Fail-open license verification with a version-scoped verdict cache.**
//!
//! hqcheck asks a remote licensing service whether an installation is
//! licensed, caches the answer in a shared [`CacheStore`], and keeps the
//! host application running when the service is unreachable, slow, or
//! answers with garbage.
//!
//! ## Features
//!
//! - **Long-lived verdicts** — successful answers are cached for 6 hours
//! - **Fail open** — transport errors, timeouts and bad status codes are
//!   cached as valid verdicts for 5 minutes, with the failure recorded
//! - **Backend-agnostic expiry** — stale verdicts are purged on read even
//!   when the store does not expire entries itself
//! - **Version scoping** — the cache key derives from the product version,
//!   so an upgrade always re-verifies
//!
//! ## Quickstart
//!
//! ```no_run
//! use hqcheck::{LicenseManager, LicensingConfig, MemoryStore};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), hqcheck::LicensingError> {
//!     let config = LicensingConfig::new(
//!         Some("pro".to_string()),
//!         Some("LICENSE-KEY-HERE".to_string()),
//!         "3.2.1",
//!         "production",
//!     );
//!
//!     let manager = LicenseManager::new(config, Arc::new(MemoryStore::new()))?;
//!     let verdict = manager.check();
//!
//!     if verdict.valid {
//!         println!("Licensed ({})", verdict.id.as_deref().unwrap_or("unknown"));
//!     }
//!     if let Some(error) = &verdict.error {
//!         println!("Licensing service unavailable: {}", error);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! Checks are synchronous and make at most one remote call each. There is
//! no request coalescing: concurrent first-time callers may each call the
//! service and overwrite the same cache entry, which is harmless because
//! verdicts are not accumulative.

#![warn(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Cache layer
pub mod cache;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// Manager (main public API)
pub mod manager;

// Re-exports for public API
pub use cache::{CacheStore, FileStore, MemoryStore};
pub use client::{FailureCategory, HqClient, RequestOutcome, StaticTransport, Transport};
pub use clock::{Clock, SystemClock};
pub use config::LicensingConfig;
pub use errors::LicensingError;
pub use manager::LicenseManager;
pub use protocol::{CachedVerdict, MetadataSource, RequestContext, VerificationPayload};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
