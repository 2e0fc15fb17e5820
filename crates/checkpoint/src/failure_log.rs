//! Append-only diagnostic log of identifiers that exhausted their retries
//!
//! One identifier per line. Never read by the engine and never deduplicated:
//! an identifier that fails in two runs appears twice.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append identifiers, creating the log on first use.
    pub async fn append<S: AsRef<str>>(&self, identifiers: &[S]) -> Result<()> {
        if identifiers.is_empty() {
            return Ok(());
        }
        let mut lines = String::new();
        for id in identifiers {
            lines.push_str(id.as_ref());
            lines.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Io(format!("opening failure log {}: {e}", self.path.display())))?;
        file.write_all(lines.as_bytes())
            .await
            .map_err(|e| Error::Io(format!("appending to failure log: {e}")))?;
        file.flush()
            .await
            .map_err(|e| Error::Io(format!("flushing failure log: {e}")))?;
        Ok(())
    }
}
