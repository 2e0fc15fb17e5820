//! Response status classification for lookup requests
//!
//! The lookup API signals per-credential quota exhaustion with HTTP 403.
//! That is the only status that changes pool state; every other failure
//! leaves the credential in rotation and is retried by the caller.

/// How a lookup response affects the credential that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 200: parse the payload, return the credential to rotation
    Success,
    /// 403: the credential's quota is spent, drop it from rotation
    QuotaExceeded,
    /// Anything else: retryable, the credential stays eligible
    Transient,
}

impl ResponseClass {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ResponseClass::Success => "ok",
            ResponseClass::QuotaExceeded => "quota",
            ResponseClass::Transient => "status",
        }
    }
}

/// Classify an upstream response by HTTP status.
pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        200 => ResponseClass::Success,
        403 => ResponseClass::QuotaExceeded,
        _ => ResponseClass::Transient,
    }
}
