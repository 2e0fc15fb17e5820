//! Resume: the input set minus what the output store already holds

use tracing::info;

use crate::error::Result;
use crate::store::OutputStore;

/// Identifiers from `input_ids` that have no row in `store` yet.
///
/// Keeps input order. A missing store means nothing is done yet.
pub async fn pending(input_ids: &[String], store: &OutputStore) -> Result<Vec<String>> {
    let done = store.identifiers().await?;
    let remaining: Vec<String> = input_ids
        .iter()
        .filter(|id| !done.contains(id.as_str()))
        .cloned()
        .collect();
    info!(
        input = input_ids.len(),
        already_classified = input_ids.len() - remaining.len(),
        pending = remaining.len(),
        "computed pending work"
    );
    Ok(remaining)
}
