//! Error types for pool operations

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every credential has been exhausted; nothing left to hand out.
    #[error("credential pool empty: {exhausted} of {total} credentials exhausted")]
    Empty { total: usize, exhausted: usize },

    #[error("credential file error: {0}")]
    CredentialFile(String),

    #[error("no credentials found in {0}")]
    NoCredentials(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
