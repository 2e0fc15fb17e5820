//! Input identifier reader

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};

/// Read every identifier from the `id_column` of a CSV file with a header row.
///
/// Cells are trimmed and blank cells skipped. Repeated identifiers collapse
/// to their first occurrence, so the returned list is a set in input order.
pub async fn read_identifiers(path: &Path, id_column: &str) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::Io(format!("reading input {}: {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let headers = reader
        .headers()
        .map_err(|e| Error::Csv(format!("reading input header: {e}")))?;
    let column = headers
        .iter()
        .position(|h| h == id_column)
        .ok_or_else(|| Error::MissingColumn {
            column: id_column.to_string(),
            path: path.display().to_string(),
        })?;

    let mut seen = HashSet::new();
    let mut identifiers = Vec::new();
    let mut duplicates = 0usize;
    for row in reader.records() {
        let row = row.map_err(|e| Error::Csv(format!("reading input row: {e}")))?;
        let Some(id) = row.get(column).filter(|id| !id.is_empty()) else {
            continue;
        };
        if seen.insert(id.to_string()) {
            identifiers.push(id.to_string());
        } else {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(duplicates, "input contains repeated identifiers, keeping first occurrence");
    }
    info!(path = %path.display(), identifiers = identifiers.len(), "input loaded");
    Ok(identifiers)
}
