//! Reqwest-based HTTP client for the licensing service.
//!
//! Sends the verification payload as a JSON POST and turns whatever
//! happens into a [`RequestOutcome`].

use crate::client::outcome::{classify_reqwest_error, RequestOutcome, Transport};
use crate::config::LicensingConfig;
use crate::protocol::payload::{resolve_app_name, VerificationPayload};
use crate::LicensingError;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::time::Duration;
use tracing::{debug, warn};

/// Licensing service HTTP client.
pub struct HqClient {
    client: Client,
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl HqClient {
    /// Create a new client from config.
    pub fn new(config: &LicensingConfig) -> Result<Self, LicensingError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| LicensingError::Transport(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            user_agent: build_user_agent(config),
            timeout: config.request_timeout,
        })
    }

    /// Get the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for HqClient {
    fn execute(&self, payload: &VerificationPayload) -> RequestOutcome {
        debug!(endpoint = %self.endpoint, "performing license check request");

        let response = match self
            .client
            .post(&self.endpoint)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .json(payload)
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                let category = classify_reqwest_error(&e);
                warn!(%category, error = %e, "license check request failed");
                return RequestOutcome::failure(category, e.to_string());
            }
        };

        let status = response.status().as_u16();
        let body = match response.bytes() {
            Ok(body) => body.to_vec(),
            Err(e) => {
                let category = classify_reqwest_error(&e);
                warn!(%category, status, error = %e, "failed to read license check response");
                return RequestOutcome::failure(category, format!("Failed to read body: {}", e));
            }
        };

        let outcome = RequestOutcome::from_status(status, body);
        if let RequestOutcome::Failure { category, .. } = &outcome {
            warn!(%category, status, "license check returned unexpected status");
        }
        outcome
    }
}

/// Build a User-Agent string from config.
///
/// Format: `<app>/hqcheck-<version>`
/// Example: `dashboard/hqcheck-0.1.0`
pub fn build_user_agent(config: &LicensingConfig) -> String {
    let app = resolve_app_name(config).unwrap_or_else(|| "unknown".to_string());
    format!("{}/hqcheck-{}", app, env!("CARGO_PKG_VERSION"))
}
