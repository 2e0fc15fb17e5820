//! Error types for storage operations

/// Errors from reading or writing the input, output store, or failure log.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("column {column:?} not found in {path}")]
    MissingColumn { column: String, path: String },
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
