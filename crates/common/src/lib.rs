//! Shared building blocks for the batch classifier workspace

mod error;
mod retry;
mod secret;

pub use error::{Error, Result};
pub use retry::{Backoff, RetryPolicy};
pub use secret::Secret;
