//! External video metadata lookup
//!
//! Defines the `Lookup` trait that decouples the classification engine from
//! the HTTP API it queries. `HttpLookup` is the production implementation;
//! tests substitute scripted lookups. The trait only performs the request:
//! status interpretation and credential bookkeeping belong to the caller,
//! and `derive_label` turns a successful payload into a classification.

pub mod http;
pub mod label;
pub mod payload;

pub use http::{DEFAULT_ENDPOINT, HttpLookup};
pub use label::{Label, LabelRules, derive_label};
pub use payload::{EmbedDimensions, VideoListResponse, parse_duration_secs};

use std::future::Future;
use std::pin::Pin;

/// Raw upstream response for one lookup attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResponse {
    pub status: u16,
    pub body: String,
}

/// Request-level failures: the upstream never produced a status code.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result alias for lookup operations.
pub type Result<T> = std::result::Result<T, LookupError>;

/// One GET-style metadata request per attempt, parameterized by video
/// identifier and access credential.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Lookup>`).
pub trait Lookup: Send + Sync {
    /// Identifier for logging (e.g. "http")
    fn id(&self) -> &str;

    fn fetch<'a>(
        &'a self,
        video_id: &'a str,
        credential: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<LookupResponse>> + Send + 'a>>;
}
