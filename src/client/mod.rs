//! Request executor.

pub mod http;
pub mod outcome;
pub mod stub;

pub use http::HqClient;
pub use outcome::{FailureCategory, RequestOutcome, Transport};
pub use stub::StaticTransport;
