//! Output store: two-column CSV keyed by identifier
//!
//! Writes use atomic temp-file + rename so a crash mid-write leaves the
//! previous store intact. A missing store file reads as empty.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::ClassificationResult;

/// Handle to the persisted output. Holds no data; every read goes to disk.
#[derive(Debug, Clone)]
pub struct OutputStore {
    path: PathBuf,
    id_column: String,
    label_column: String,
}

impl OutputStore {
    pub fn new(path: PathBuf, id_column: String, label_column: String) -> Self {
        Self {
            path,
            id_column,
            label_column,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every persisted row in file order. A missing file is an empty store.
    pub async fn load(&self) -> Result<Vec<ClassificationResult>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Io(format!(
                    "reading output store {}: {e}",
                    self.path.display()
                )));
            }
        };
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes.as_slice());
        let headers = reader
            .headers()
            .map_err(|e| Error::Csv(format!("reading output store header: {e}")))?;
        let id_idx = self.column_index(headers, &self.id_column)?;
        let label_idx = self.column_index(headers, &self.label_column)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| Error::Csv(format!("reading output store row: {e}")))?;
            let identifier = record.get(id_idx).unwrap_or_default();
            if identifier.is_empty() {
                continue;
            }
            let label = record.get(label_idx).unwrap_or_default();
            rows.push(ClassificationResult::new(identifier, label));
        }
        debug!(path = %self.path.display(), rows = rows.len(), "loaded output store");
        Ok(rows)
    }

    /// Identifiers already persisted.
    pub async fn identifiers(&self) -> Result<HashSet<String>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|r| r.identifier)
            .collect())
    }

    /// Replace the store contents with `rows`.
    ///
    /// Writes to a temporary file in the same directory, then renames it over
    /// the target, so readers see either the old or the new store.
    pub async fn write_atomic(&self, rows: &[ClassificationResult]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([self.id_column.as_str(), self.label_column.as_str()])
            .map_err(|e| Error::Csv(format!("serializing output header: {e}")))?;
        for row in rows {
            writer
                .write_record([row.identifier.as_str(), row.label.as_str()])
                .map_err(|e| Error::Csv(format!("serializing output row: {e}")))?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| Error::Csv(format!("finishing output buffer: {e}")))?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| Error::Io("output store path has no file name".into()))?
            .to_string_lossy();
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

        tokio::fs::write(&tmp_path, &data)
            .await
            .map_err(|e| Error::Io(format!("writing temp output file: {e}")))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| Error::Io(format!("renaming temp output file: {e}")))?;

        debug!(path = %self.path.display(), rows = rows.len(), "persisted output store");
        Ok(())
    }

    fn column_index(&self, headers: &csv::StringRecord, column: &str) -> Result<usize> {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| Error::MissingColumn {
                column: column.to_string(),
                path: self.path.display().to_string(),
            })
    }
}
