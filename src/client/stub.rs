//! Canned transport for environments that must not reach the network.

use crate::client::outcome::{RequestOutcome, Transport};
use crate::protocol::payload::VerificationPayload;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Body answered by [`StaticTransport::licensed`].
pub const LICENSED_BODY: &str = r#"{"id":"pro","valid":true}"#;

/// Transport that answers every request with the same outcome.
#[derive(Debug)]
pub struct StaticTransport {
    outcome: RequestOutcome,
    calls: AtomicUsize,
}

impl StaticTransport {
    /// Answer every request with `outcome`.
    pub fn new(outcome: RequestOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer every request with a valid `pro` license.
    pub fn licensed() -> Self {
        Self::new(RequestOutcome::Success {
            status: 200,
            body: LICENSED_BODY.as_bytes().to_vec(),
        })
    }

    /// Number of requests executed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for StaticTransport {
    fn execute(&self, _payload: &VerificationPayload) -> RequestOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
