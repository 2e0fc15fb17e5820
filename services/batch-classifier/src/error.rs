//! Service-specific error types

use thiserror::Error;

/// Run-level errors that end a run early.
///
/// Per-identifier lookup failures never surface here: they become `failed`
/// rows in the output store. Only problems with the inputs or with
/// persistence abort the run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("reading run input failed: {0}")]
    Input(#[source] checkpoint::Error),

    #[error("persisting results failed: {0}")]
    Persistence(#[source] checkpoint::Error),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, RunError>;
