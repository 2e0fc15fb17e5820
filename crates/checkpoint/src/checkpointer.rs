//! Buffered checkpointing with read-merge-write flushes
//!
//! Results accumulate in memory and are committed in batches. A single tokio
//! Mutex guards the buffer and spans the whole flush (load, merge, write,
//! failure-log append), so two flushes never interleave and producers wait
//! while a flush is in progress. The buffer is cleared only after a flush
//! succeeds; a failed flush keeps every result for the next attempt.

use std::collections::HashSet;

use common::RetryPolicy;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::Result;
use crate::failure_log::FailureLog;
use crate::record::ClassificationResult;
use crate::store::OutputStore;

/// Outcome of one committed flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Results taken from the buffer
    pub buffered: usize,
    /// New rows added to the store
    pub written: usize,
    /// Buffered results skipped because the store already had the identifier
    pub duplicates: usize,
    /// Identifiers appended to the failure log
    pub failures_logged: usize,
    /// Rows in the store after the flush
    pub total_rows: usize,
}

pub struct Checkpointer {
    store: OutputStore,
    failure_log: FailureLog,
    threshold: usize,
    retry: RetryPolicy,
    buffer: Mutex<Vec<ClassificationResult>>,
}

impl Checkpointer {
    /// `threshold` is clamped to at least 1.
    pub fn new(
        store: OutputStore,
        failure_log: FailureLog,
        threshold: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            failure_log,
            threshold: threshold.max(1),
            retry,
            buffer: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Buffer one result; flush when the buffer reaches the threshold.
    ///
    /// Returns the flush report if this call triggered a flush.
    pub async fn record(&self, result: ClassificationResult) -> Result<Option<FlushReport>> {
        let mut buffer = self.buffer.lock().await;
        buffer.push(result);
        if buffer.len() < self.threshold {
            return Ok(None);
        }
        self.flush_locked(&mut buffer).await.map(Some)
    }

    /// Buffer one result without flushing, whatever the buffer size.
    ///
    /// Used after a flush has failed, so results still arriving are kept for
    /// the final flush instead of re-attempting a write on every record.
    pub async fn hold(&self, result: ClassificationResult) {
        self.buffer.lock().await.push(result);
    }

    /// Commit everything buffered. A no-op when the buffer is empty.
    pub async fn flush(&self) -> Result<FlushReport> {
        let mut buffer = self.buffer.lock().await;
        self.flush_locked(&mut buffer).await
    }

    /// Results waiting for the next flush.
    pub async fn buffered(&self) -> usize {
        self.buffer.lock().await.len()
    }

    async fn flush_locked(&self, buffer: &mut Vec<ClassificationResult>) -> Result<FlushReport> {
        if buffer.is_empty() {
            return Ok(FlushReport::default());
        }

        let batch: &[ClassificationResult] = buffer;
        let outcome = self
            .retry
            .run("checkpoint flush", move |_| self.merge_and_write(batch))
            .await;

        match outcome {
            Ok(report) => {
                buffer.clear();
                metrics::counter!("classifier_flushes_total", "status" => "ok").increment(1);
                info!(
                    written = report.written,
                    duplicates = report.duplicates,
                    failures_logged = report.failures_logged,
                    total_rows = report.total_rows,
                    "checkpoint flushed"
                );
                Ok(report)
            }
            Err(e) => {
                metrics::counter!("classifier_flushes_total", "status" => "error").increment(1);
                error!(
                    error = %e,
                    buffered = buffer.len(),
                    attempts = self.retry.max_attempts(),
                    "checkpoint flush failed, results kept in memory"
                );
                Err(e)
            }
        }
    }

    /// One read-merge-write cycle. Safe to repeat: identifiers written by an
    /// earlier partial attempt are skipped by the merge.
    async fn merge_and_write(&self, batch: &[ClassificationResult]) -> Result<FlushReport> {
        let existing = self.store.load().await?;
        let (merged, written, duplicates) = merge(existing, batch);
        self.store.write_atomic(&merged).await?;

        let failed: Vec<&str> = batch
            .iter()
            .filter(|r| r.is_failure())
            .map(|r| r.identifier.as_str())
            .collect();
        self.failure_log.append(failed.as_slice()).await?;

        Ok(FlushReport {
            buffered: batch.len(),
            written,
            duplicates,
            failures_logged: failed.len(),
            total_rows: merged.len(),
        })
    }
}

/// Append `batch` to `existing`, skipping identifiers already present.
///
/// The first row for an identifier wins, both within `existing` and within
/// `batch`. Returns the merged rows, the count added, and the count skipped.
fn merge(
    existing: Vec<ClassificationResult>,
    batch: &[ClassificationResult],
) -> (Vec<ClassificationResult>, usize, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(existing.len() + batch.len());
    let mut merged = Vec::with_capacity(existing.len() + batch.len());
    for row in existing {
        if seen.insert(row.identifier.clone()) {
            merged.push(row);
        }
    }

    let before = merged.len();
    for row in batch {
        if seen.insert(row.identifier.clone()) {
            merged.push(row.clone());
        }
    }
    let written = merged.len() - before;
    (merged, written, batch.len() - written)
}
