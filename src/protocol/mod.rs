//! Wire payloads and cached verdict records.

pub mod models;
pub mod normalize;
pub mod payload;

pub use models::CachedVerdict;
pub use normalize::normalize;
pub use payload::{MetadataSource, RequestContext, SystemMetadata, VerificationPayload};
