//! Request outcomes and failure classification.
//!
//! Every remote call ends in a [`RequestOutcome`]. Transport errors, TLS
//! problems, timeouts and unexpected status codes are all mapped onto an
//! explicit [`FailureCategory`] here; nothing is propagated to the caller.

use crate::config::LicensingConfig;
use crate::protocol::payload::VerificationPayload;
use std::error::Error as StdError;
use std::fmt;
use std::io::ErrorKind;
use std::time::Duration;

/// Executes a verification request.
pub trait Transport: Send + Sync {
    /// Send the payload to the licensing service. Never fails: every
    /// problem is reported as [`RequestOutcome::Failure`].
    fn execute(&self, payload: &VerificationPayload) -> RequestOutcome;
}

/// Why a verification request did not produce a usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// Host or network unreachable.
    HostUnreachable,
    /// Connection reset or aborted by the peer.
    ConnectionReset,
    /// Connection refused.
    ConnectionRefused,
    /// TLS negotiation failed.
    Tls,
    /// Timed out while connecting.
    ConnectTimeout,
    /// Timed out waiting for or reading the response.
    ReadTimeout,
    /// Host name could not be resolved.
    NameResolution,
    /// Any other transport-level error.
    Transport,
    /// Service answered HTTP 500.
    ServerError,
    /// Service answered an unexpected status code.
    InvalidResponse,
    /// Anything not covered above.
    CallError,
}

impl FailureCategory {
    /// All categories, in declaration order.
    pub const ALL: [FailureCategory; 11] = [
        FailureCategory::HostUnreachable,
        FailureCategory::ConnectionReset,
        FailureCategory::ConnectionRefused,
        FailureCategory::Tls,
        FailureCategory::ConnectTimeout,
        FailureCategory::ReadTimeout,
        FailureCategory::NameResolution,
        FailureCategory::Transport,
        FailureCategory::ServerError,
        FailureCategory::InvalidResponse,
        FailureCategory::CallError,
    ];

    /// Human-readable label stored in the verdict's `error` field.
    pub fn label(&self) -> &'static str {
        match self {
            FailureCategory::HostUnreachable => "HTTP host not reachable error.",
            FailureCategory::ConnectionReset => "HTTP connection reset error.",
            FailureCategory::ConnectionRefused => "HTTP connection refused error.",
            FailureCategory::Tls => "TLS negotiation error.",
            FailureCategory::ConnectTimeout => "Request timeout.",
            FailureCategory::ReadTimeout => "Request timeout.",
            FailureCategory::NameResolution => "Name resolution error.",
            FailureCategory::Transport => "Connection error.",
            FailureCategory::ServerError => "HQ internal server error.",
            FailureCategory::InvalidResponse => "Invalid response.",
            FailureCategory::CallError => "HQ call error.",
        }
    }

    /// Stable machine-readable code stored in the verdict's `error_code` field.
    pub fn code(&self) -> &'static str {
        match self {
            FailureCategory::HostUnreachable => "host_unreachable",
            FailureCategory::ConnectionReset => "connection_reset",
            FailureCategory::ConnectionRefused => "connection_refused",
            FailureCategory::Tls => "tls_error",
            FailureCategory::ConnectTimeout => "connect_timeout",
            FailureCategory::ReadTimeout => "read_timeout",
            FailureCategory::NameResolution => "dns_error",
            FailureCategory::Transport => "transport_error",
            FailureCategory::ServerError => "server_error",
            FailureCategory::InvalidResponse => "invalid_response",
            FailureCategory::CallError => "call_error",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of one verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The service answered HTTP 200.
    Success {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: Vec<u8>,
    },
    /// The request failed or the answer was unusable.
    Failure {
        /// Failure category.
        category: FailureCategory,
        /// Underlying error or response detail.
        message: String,
    },
}

impl RequestOutcome {
    /// Shorthand for a failure outcome.
    pub fn failure(category: FailureCategory, message: impl Into<String>) -> Self {
        RequestOutcome::Failure {
            category,
            message: message.into(),
        }
    }

    /// Map a received HTTP response onto an outcome.
    pub fn from_status(status: u16, body: Vec<u8>) -> Self {
        match status {
            200 => RequestOutcome::Success { status, body },
            500 => RequestOutcome::failure(
                FailureCategory::ServerError,
                String::from_utf8_lossy(&body),
            ),
            _ => RequestOutcome::failure(
                FailureCategory::InvalidResponse,
                format!(
                    "code: {}, body: {}",
                    status,
                    String::from_utf8_lossy(&body)
                ),
            ),
        }
    }

    /// Whether the service produced a usable answer.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }

    /// Cache lifetime for a verdict built from this outcome.
    pub fn ttl(&self, config: &LicensingConfig) -> Duration {
        match self {
            RequestOutcome::Success { .. } => config.cache_ttl,
            RequestOutcome::Failure { .. } => config.failure_ttl,
        }
    }
}

/// Classify a reqwest error.
pub fn classify_reqwest_error(error: &reqwest::Error) -> FailureCategory {
    if let Some(category) = classify_timeout(error.is_timeout(), error.is_connect()) {
        return category;
    }

    // The top-level message embeds the URL, so only sources are inspected.
    if let Some(category) = error.source().and_then(classify_error_chain) {
        return category;
    }

    if error.is_connect() || error.is_request() || error.is_body() || error.is_decode() {
        FailureCategory::Transport
    } else {
        FailureCategory::CallError
    }
}

/// Split timeouts into connect and read timeouts.
pub fn classify_timeout(is_timeout: bool, is_connect: bool) -> Option<FailureCategory> {
    match (is_timeout, is_connect) {
        (true, true) => Some(FailureCategory::ConnectTimeout),
        (true, false) => Some(FailureCategory::ReadTimeout),
        (false, _) => None,
    }
}

/// Classify an error by walking its `source()` chain.
///
/// Returns `None` when nothing in the chain identifies a specific category.
pub fn classify_error_chain(error: &(dyn StdError + 'static)) -> Option<FailureCategory> {
    let mut current = Some(error);

    while let Some(err) = current {
        if let Some(category) = err.downcast_ref::<std::io::Error>().and_then(classify_io_error) {
            return Some(category);
        }
        if let Some(category) = classify_message(&err.to_string()) {
            return Some(category);
        }
        current = err.source();
    }

    None
}

fn classify_io_error(error: &std::io::Error) -> Option<FailureCategory> {
    match error.kind() {
        ErrorKind::ConnectionRefused => Some(FailureCategory::ConnectionRefused),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            Some(FailureCategory::ConnectionReset)
        }
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
            Some(FailureCategory::HostUnreachable)
        }
        ErrorKind::TimedOut => Some(FailureCategory::ReadTimeout),
        _ => None,
    }
}

const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host",
];

const TLS_MARKERS: &[&str] = &[
    "invalid peer certificate",
    "invalid certificate",
    "received fatal alert",
    "peer is incompatible",
    "peer misbehaved",
    "tls handshake",
    "handshake failure",
];

fn classify_message(message: &str) -> Option<FailureCategory> {
    let message = message.to_lowercase();

    if DNS_MARKERS.iter().any(|m| message.contains(m)) {
        Some(FailureCategory::NameResolution)
    } else if TLS_MARKERS.iter().any(|m| message.contains(m)) {
        Some(FailureCategory::Tls)
    } else {
        None
    }
}
