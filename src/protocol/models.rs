//! Cached verdict record.

use crate::cache::store::Record;
use crate::protocol::payload::VerificationPayload;
use crate::LicensingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Keys owned by the verdict itself; remote fields with these names are
/// overwritten on merge.
const RESERVED_KEYS: &[&str] = &[
    "id",
    "valid",
    "error",
    "error_code",
    "exception_message",
    "expiry",
    "fetched_at",
    "payload",
];

/// The cached outcome of a license check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVerdict {
    /// License identifier reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Whether the installation is licensed.
    #[serde(default)]
    pub valid: bool,

    /// Human-readable error label when the check failed open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Machine-readable failure category when the check failed open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Raw transport error or response detail behind `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,

    /// Time-to-live applied to this verdict, in seconds.
    pub expiry: u64,

    /// When the verdict was fetched.
    pub fetched_at: DateTime<Utc>,

    /// The verification payload sent with the request.
    pub payload: VerificationPayload,

    /// Remaining fields of the remote response.
    #[serde(flatten)]
    pub response: Map<String, Value>,
}

impl CachedVerdict {
    /// Merge a normalized remote response with the request payload.
    ///
    /// `valid` is taken from the response and is `false` unless the response
    /// carries a boolean `true`.
    pub fn from_response(
        mut response: Map<String, Value>,
        ttl: Duration,
        payload: VerificationPayload,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let id = response.get("id").and_then(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });
        let valid = response
            .get("valid")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let error = string_field(&response, "error");
        let error_code = string_field(&response, "error_code");
        let exception_message = string_field(&response, "exception_message");

        for key in RESERVED_KEYS {
            response.remove(*key);
        }

        Self {
            id,
            valid,
            error,
            error_code,
            exception_message,
            expiry: ttl.as_secs(),
            fetched_at,
            payload,
            response,
        }
    }

    /// Build a fail-open verdict for a remote call that could not be
    /// completed or understood.
    pub fn fail_open(
        license: Option<String>,
        error_code: &str,
        error: &str,
        exception_message: String,
        ttl: Duration,
        payload: VerificationPayload,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let response = json!({
            "id": license,
            "valid": true,
            "error": error,
            "error_code": error_code,
            "exception_message": exception_message,
        });

        let response = match response {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self::from_response(response, ttl, payload, fetched_at)
    }

    /// Time-to-live applied to this verdict.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.expiry)
    }

    /// When this verdict stops being fresh.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.expiry).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(ttl)
            .and_then(|ttl| self.fetched_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether `fetched_at + expiry` lies before `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() < now
    }

    /// Whether this verdict came from a failed remote call.
    pub fn is_fail_open(&self) -> bool {
        self.error.is_some()
    }

    /// Encode as a store record.
    pub fn to_record(&self) -> Result<Record, LicensingError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(LicensingError::CacheFormat(
                "verdict did not serialize to an object".to_string(),
            )),
            Err(e) => Err(LicensingError::CacheFormat(format!(
                "Failed to serialize verdict: {}",
                e
            ))),
        }
    }

    /// Decode from a store record.
    pub fn from_record(record: Record) -> Result<Self, LicensingError> {
        serde_json::from_value(Value::Object(record))
            .map_err(|e| LicensingError::CacheFormat(format!("Failed to deserialize verdict: {}", e)))
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(String::from)
}
