//! hqcheck configuration.

use crate::LicensingError;
use std::time::Duration;

/// Verification endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://v3.avohq.io/api/v3/licenses/check";

/// Request timeout for the verification call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Time-to-live applied to verdicts from a successful remote call.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Time-to-live applied to fail-open verdicts.
pub const DEFAULT_FAILURE_TTL: Duration = Duration::from_secs(5 * 60);

/// Environment name in which the remote service is never contacted.
pub const TEST_ENVIRONMENT: &str = "test";

/// Configuration for license verification.
///
/// These values come from the host application's configuration and are
/// read-only from the client's perspective.
#[derive(Debug, Clone)]
pub struct LicensingConfig {
    /// License identifier (e.g., "community", "pro").
    pub license: Option<String>,

    /// License key issued to the installation.
    pub license_key: Option<String>,

    /// Version of the licensed product. Scopes the verdict cache key.
    pub product_version: String,

    /// Version of the host runtime or framework the product runs in.
    pub runtime_version: String,

    /// Deployment environment name (e.g., "production", "development").
    pub environment: String,

    /// Application name reported to the licensing service.
    /// Derived from the running executable when unset.
    pub app_name: Option<String>,

    /// Verification endpoint URL.
    pub endpoint: String,

    /// Timeout for the verification request.
    pub request_timeout: Duration,

    /// Cache lifetime of a verdict obtained from the remote service.
    pub cache_ttl: Duration,

    /// Cache lifetime of a fail-open verdict.
    pub failure_ttl: Duration,
}

impl LicensingConfig {
    /// Create a configuration with default endpoint, timeout and TTLs.
    pub fn new(
        license: Option<String>,
        license_key: Option<String>,
        product_version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            license,
            license_key,
            product_version: product_version.into(),
            runtime_version: String::new(),
            environment: environment.into(),
            app_name: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            failure_ttl: DEFAULT_FAILURE_TTL,
        }
    }

    /// Whether the remote service should be replaced by a canned answer.
    pub fn is_test_environment(&self) -> bool {
        self.environment == TEST_ENVIRONMENT
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), LicensingError> {
        if self.product_version.trim().is_empty() {
            return Err(LicensingError::ConfigError(
                "product_version cannot be empty".to_string(),
            ));
        }
        if let Err(e) = reqwest::Url::parse(&self.endpoint) {
            return Err(LicensingError::ConfigError(format!(
                "endpoint is not a valid URL ({}): {}",
                self.endpoint, e
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(LicensingError::ConfigError(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.cache_ttl.is_zero() || self.failure_ttl.is_zero() {
            return Err(LicensingError::ConfigError(
                "cache TTLs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
