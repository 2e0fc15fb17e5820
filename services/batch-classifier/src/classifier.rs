//! Per-identifier classification with credential rotation and retry
//!
//! One attempt walks the credential pool: a 403 retires the credential and
//! moves to the next one, any other answer ends the attempt. Attempts that
//! end without a 200 are retried by the outer policy; when the policy gives
//! up the identifier is labelled `failed`.

use std::sync::Arc;
use std::time::Instant;

use common::RetryPolicy;
use credential_pool::{CredentialPool, ResponseClass, classify_status};
use thiserror::Error;
use tracing::{debug, warn};
use video_lookup::{Label, LabelRules, Lookup, LookupError, derive_label};

use crate::metrics;

/// Why one attempt produced no label. Every variant is retryable.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("no credential left in rotation")]
    PoolEmpty,

    #[error("every credential tried ({tried}) hit its quota")]
    QuotaExhausted { tried: usize },

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

pub struct Classifier {
    pool: Arc<CredentialPool>,
    lookup: Arc<dyn Lookup>,
    rules: LabelRules,
    retry: RetryPolicy,
}

impl Classifier {
    pub fn new(
        pool: Arc<CredentialPool>,
        lookup: Arc<dyn Lookup>,
        rules: LabelRules,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            pool,
            lookup,
            rules,
            retry,
        }
    }

    /// Classify one identifier. Never fails: a spent retry budget is `Failed`.
    pub async fn classify(&self, video_id: &str) -> Label {
        match self
            .retry
            .run("lookup", |_| self.attempt(video_id))
            .await
        {
            Ok(label) => label,
            Err(e) => {
                warn!(
                    video_id,
                    attempts = self.retry.max_attempts(),
                    error = %e,
                    "retry budget exhausted, marking failed"
                );
                Label::Failed
            }
        }
    }

    /// One attempt: try credentials until one gets an answer other than 403,
    /// at most once per credential the pool started with.
    pub async fn attempt(&self, video_id: &str) -> Result<Label, AttemptError> {
        let total = self.pool.total();
        let mut tried = 0;

        while tried < total {
            let credential = match self.pool.acquire().await {
                Ok(c) => c,
                Err(e) => {
                    debug!(video_id, error = %e, "no credential available");
                    return Err(AttemptError::PoolEmpty);
                }
            };
            tried += 1;

            let started = Instant::now();
            let response = self.lookup.fetch(video_id, credential.token()).await;
            let elapsed = started.elapsed().as_secs_f64();

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    metrics::record_lookup("transport", elapsed);
                    self.pool.release(credential).await;
                    return Err(e.into());
                }
            };

            let class = classify_status(response.status);
            metrics::record_lookup(class.label(), elapsed);
            match class {
                ResponseClass::Success => {
                    self.pool.release(credential).await;
                    let label = derive_label(&response.body, &self.rules);
                    debug!(video_id, %label, "classified");
                    return Ok(label);
                }
                ResponseClass::QuotaExceeded => {
                    self.pool.mark_exhausted(credential).await;
                }
                ResponseClass::Transient => {
                    self.pool.release(credential).await;
                    return Err(AttemptError::Status(response.status));
                }
            }
        }

        Err(AttemptError::QuotaExhausted { tried })
    }
}
