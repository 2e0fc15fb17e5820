//! Fixed-size worker pool over a shared identifier queue
//!
//! Each worker checks the shutdown controller, pops the next identifier,
//! classifies it and sends the result down a bounded channel. Results arrive
//! in completion order. Workers stop when the queue is empty, when shutdown
//! is requested, or when the consumer drops the receiver.

use std::collections::VecDeque;
use std::sync::Arc;

use checkpoint::ClassificationResult;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::debug;

use crate::classifier::Classifier;
use crate::service::ShutdownController;

/// Results a worker can send before it waits for the consumer.
const RESULTS_PER_WORKER: usize = 4;

pub struct WorkerPool {
    classifier: Arc<Classifier>,
    concurrency: usize,
}

impl WorkerPool {
    /// `concurrency` is clamped to at least 1.
    pub fn new(classifier: Arc<Classifier>, concurrency: usize) -> Self {
        Self {
            classifier,
            concurrency: concurrency.max(1),
        }
    }

    /// Start the workers over `identifiers`.
    ///
    /// The receiver yields exactly one result per identifier that was
    /// dispatched. It closes once every worker has exited.
    pub fn spawn(
        &self,
        identifiers: Vec<String>,
        shutdown: Arc<ShutdownController>,
    ) -> (mpsc::Receiver<ClassificationResult>, JoinSet<usize>) {
        let queue = Arc::new(Mutex::new(VecDeque::from(identifiers)));
        let (tx, rx) = mpsc::channel(self.concurrency * RESULTS_PER_WORKER);

        let mut workers = JoinSet::new();
        for worker in 0..self.concurrency {
            workers.spawn(run_worker(
                worker,
                queue.clone(),
                self.classifier.clone(),
                shutdown.clone(),
                tx.clone(),
            ));
        }
        (rx, workers)
    }
}

/// Returns the number of identifiers this worker processed.
async fn run_worker(
    worker: usize,
    queue: Arc<Mutex<VecDeque<String>>>,
    classifier: Arc<Classifier>,
    shutdown: Arc<ShutdownController>,
    results: mpsc::Sender<ClassificationResult>,
) -> usize {
    let mut processed = 0;
    loop {
        if shutdown.is_shutting_down() {
            debug!(worker, processed, "shutdown requested, worker stopping");
            break;
        }
        let Some(video_id) = queue.lock().await.pop_front() else {
            debug!(worker, processed, "queue drained, worker stopping");
            break;
        };

        let label = classifier.classify(&video_id).await;
        processed += 1;
        if results
            .send(ClassificationResult::new(video_id, label.as_str()))
            .await
            .is_err()
        {
            debug!(worker, "result consumer gone, worker stopping");
            break;
        }
    }
    processed
}
