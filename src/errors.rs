//! hqcheck error types.

use thiserror::Error;

/// Errors surfaced by the licensing client.
///
/// Remote failures never show up here: they are classified by the request
/// executor and cached as fail-open verdicts instead.
#[derive(Debug, Error)]
pub enum LicensingError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Cache store I/O error.
    #[error("Cache I/O error: {0}")]
    CacheIO(String),

    /// A stored record could not be encoded or decoded.
    #[error("Cache format error: {0}")]
    CacheFormat(String),

    /// Diagnostic metadata could not be collected.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// HTTP client could not be constructed.
    #[error("Transport setup error: {0}")]
    Transport(String),
}
