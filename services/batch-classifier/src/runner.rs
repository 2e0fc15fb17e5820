//! One batch run: resume, dispatch, persist
//!
//! 1. Read the input identifiers and subtract those already in the store
//! 2. Start the worker pool over what remains
//! 3. Feed every result to the checkpointer (threshold flushes)
//! 4. After the workers exit, flush whatever is still buffered
//!
//! A failed flush stops dispatch, keeps later results in memory and tries
//! once more at the end before the run reports the error. Results received
//! from workers are never discarded without a flush attempt.

use std::fmt;
use std::sync::Arc;

use checkpoint::{Checkpointer, ClassificationResult, FailureLog, OutputStore};
use credential_pool::{CredentialPool, PoolStatus};
use tracing::{error, info, warn};
use video_lookup::{LabelRules, Lookup};

use crate::classifier::Classifier;
use crate::config::Config;
use crate::engine::WorkerPool;
use crate::error::{Result, RunError};
use crate::metrics;
use crate::service::{RunOutcome, ShutdownController};

/// Results between progress log lines.
const PROGRESS_EVERY: usize = 100;

/// End-of-run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifiers in the input
    pub input: usize,
    /// Identifiers already in the store when the run started
    pub resumed: usize,
    /// Identifiers this run set out to process
    pub pending: usize,
    /// Results persisted with a short or standard label
    pub classified: usize,
    /// Results persisted as failed
    pub failed: usize,
    /// Pending identifiers never dispatched
    pub remaining: usize,
    pub credentials: PoolStatus,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            RunOutcome::Completed => "completed",
            RunOutcome::Interrupted => "interrupted",
        };
        write!(
            f,
            "run {outcome}: {} classified, {} failed, {} remaining \
             ({} input, {} already done); credentials {}/{} in rotation",
            self.classified,
            self.failed,
            self.remaining,
            self.input,
            self.resumed,
            self.credentials.in_rotation,
            self.credentials.total,
        )
    }
}

/// Running tally of consumed results.
#[derive(Debug, Default)]
struct Progress {
    pending: usize,
    classified: usize,
    failed: usize,
}

impl Progress {
    fn observe(&mut self, result: &ClassificationResult) {
        if result.is_failure() {
            self.failed += 1;
        } else {
            self.classified += 1;
        }
        metrics::record_result(&result.label);

        let done = self.done();
        if done % PROGRESS_EVERY == 0 {
            info!(
                done,
                pending = self.pending,
                classified = self.classified,
                failed = self.failed,
                "progress"
            );
        }
    }

    fn done(&self) -> usize {
        self.classified + self.failed
    }
}

pub struct Runner {
    input: std::path::PathBuf,
    id_column: String,
    pool: Arc<CredentialPool>,
    workers: WorkerPool,
    checkpointer: Checkpointer,
}

impl Runner {
    pub fn new(config: &Config, pool: Arc<CredentialPool>, lookup: Arc<dyn Lookup>) -> Self {
        let classifier = Classifier::new(
            pool.clone(),
            lookup,
            LabelRules {
                short_max_secs: config.lookup.short_max_secs,
            },
            config.engine.lookup_retry(),
        );
        let store = OutputStore::new(
            config.output.path.clone(),
            config.input.id_column.clone(),
            config.output.label_column.clone(),
        );
        let checkpointer = Checkpointer::new(
            store,
            FailureLog::new(config.output.failure_log.clone()),
            config.engine.flush_threshold,
            config.engine.flush_retry(),
        );

        Self {
            input: config.input.path.clone(),
            id_column: config.input.id_column.clone(),
            pool,
            workers: WorkerPool::new(Arc::new(classifier), config.engine.workers),
            checkpointer,
        }
    }

    pub async fn run(&self, shutdown: Arc<ShutdownController>) -> Result<RunSummary> {
        let input = checkpoint::read_identifiers(&self.input, &self.id_column)
            .await
            .map_err(RunError::Input)?;
        let pending = checkpoint::pending(&input, self.checkpointer.store())
            .await
            .map_err(RunError::Input)?;

        let mut progress = Progress {
            pending: pending.len(),
            ..Progress::default()
        };
        let credentials = self.pool.status().await;
        info!(
            input = input.len(),
            pending = pending.len(),
            credentials = credentials.total,
            credentials_in_rotation = credentials.in_rotation,
            "run starting"
        );

        let (mut results, mut workers) = self.workers.spawn(pending, shutdown.clone());
        let mut flush_error = None;
        let mut draining = false;
        loop {
            let received = tokio::select! {
                received = results.recv() => received,
                _ = shutdown.wait(), if !draining => {
                    draining = true;
                    info!(
                        done = progress.done(),
                        pending = progress.pending,
                        "draining in-flight lookups before final flush"
                    );
                    continue;
                }
            };
            let Some(result) = received else {
                break;
            };

            progress.observe(&result);
            if flush_error.is_some() {
                self.checkpointer.hold(result).await;
                continue;
            }
            if let Err(e) = self.checkpointer.record(result).await {
                error!(error = %e, "checkpoint failed, stopping dispatch");
                shutdown.trigger();
                flush_error = Some(e);
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task failed");
            }
        }

        let final_flush = self.checkpointer.flush().await;
        if let Some(e) = flush_error {
            if final_flush.is_ok() {
                warn!("final flush persisted results held after the earlier failure");
            }
            return Err(RunError::Persistence(e));
        }
        final_flush.map_err(RunError::Persistence)?;

        let credentials = self.pool.status().await;
        if credentials.in_rotation == 0 {
            warn!(
                total = credentials.total,
                "every credential exhausted its quota during the run"
            );
        }

        let remaining = progress.pending - progress.done();
        let outcome = if remaining == 0 {
            RunOutcome::Completed
        } else {
            RunOutcome::Interrupted
        };
        let summary = RunSummary {
            input: input.len(),
            resumed: input.len() - progress.pending,
            pending: progress.pending,
            classified: progress.classified,
            failed: progress.failed,
            remaining,
            credentials,
            outcome,
        };
        info!(
            classified = summary.classified,
            failed = summary.failed,
            remaining = summary.remaining,
            outcome = ?summary.outcome,
            "run finished"
        );
        Ok(summary)
    }
}
