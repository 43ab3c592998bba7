//! Outbound verification request body.

use crate::config::LicensingConfig;
use crate::LicensingError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// Error descriptor substituted when metadata collection fails.
pub const METADATA_FAILURE: &str = "Failed to generate the metadata";

/// Inbound request facts associated with a check.
///
/// Absent when a check runs outside a request, e.g. in a background job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Client IP address.
    pub ip: Option<String>,
    /// Requested host name.
    pub host: Option<String>,
    /// Requested port.
    pub port: Option<u16>,
}

/// Source of auxiliary diagnostic metadata sent with each verification.
pub trait MetadataSource: Send + Sync {
    /// Collect the metadata block.
    fn collect(&self) -> Result<Value, LicensingError>;
}

/// Reports basic facts about the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMetadata;

impl MetadataSource for SystemMetadata {
    fn collect(&self) -> Result<Value, LicensingError> {
        let executable = std::env::current_exe()
            .map_err(|e| LicensingError::Metadata(format!("Failed to locate executable: {}", e)))?;

        Ok(json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "pid": std::process::id(),
            "executable": executable.display().to_string(),
            "client_version": env!("CARGO_PKG_VERSION"),
        }))
    }
}

/// Body of the verification request.
///
/// Built fresh for every request and echoed back inside the cached verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationPayload {
    /// License identifier.
    pub license: Option<String>,
    /// License key.
    pub license_key: Option<String>,
    /// Licensed product version.
    pub product_version: String,
    /// Host runtime version.
    pub runtime_version: String,
    /// Version of this client library.
    pub client_version: String,
    /// Deployment environment name.
    pub environment: String,
    /// Requester IP.
    pub ip: Option<String>,
    /// Requester host.
    pub host: Option<String>,
    /// Requester port.
    pub port: Option<u16>,
    /// Application name.
    pub app_name: Option<String>,
    /// Diagnostic metadata, or an error descriptor when collection failed.
    pub metadata: Value,
}

impl VerificationPayload {
    /// Build a payload from configuration and an optional request context.
    ///
    /// Never fails: a metadata collection error is replaced by a small
    /// `{error, error_message}` descriptor.
    pub fn build(
        config: &LicensingConfig,
        request: Option<&RequestContext>,
        metadata: &dyn MetadataSource,
    ) -> Self {
        let metadata = match metadata.collect() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "metadata collection failed");
                json!({
                    "error": METADATA_FAILURE,
                    "error_message": e.to_string(),
                })
            }
        };

        Self {
            license: config.license.clone(),
            license_key: config.license_key.clone(),
            product_version: config.product_version.clone(),
            runtime_version: config.runtime_version.clone(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: config.environment.clone(),
            ip: request.and_then(|r| r.ip.clone()),
            host: request.and_then(|r| r.host.clone()),
            port: request.and_then(|r| r.port),
            app_name: resolve_app_name(config),
            metadata,
        }
    }
}

/// Application name from configuration, else the running executable's stem.
pub fn resolve_app_name(config: &LicensingConfig) -> Option<String> {
    if let Some(name) = config.app_name.as_ref().filter(|n| !n.is_empty()) {
        return Some(name.clone());
    }

    std::env::current_exe()
        .ok()?
        .file_stem()?
        .to_str()
        .map(String::from)
}
