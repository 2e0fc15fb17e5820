//! Credential rotation queue
//!
//! Idle credentials sit in a FIFO queue. `acquire` pops the front, `release`
//! pushes to the back, so successful credentials rotate evenly across workers.
//! `mark_exhausted` consumes the credential without returning it, which is
//! the only way the in-rotation count changes.
//!
//! When every in-rotation credential is checked out by other workers,
//! `acquire` waits on a `Notify` until one is released or exhausted. When the
//! in-rotation count is zero it returns `Error::Empty` immediately, so an
//! exhausted pool turns into fast failures rather than stalled workers.

use std::collections::VecDeque;
use std::path::Path;

use common::Secret;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// One access token, held exclusively by the worker that acquired it.
///
/// Deliberately not `Clone`: returning it to the pool moves it back.
#[derive(Debug)]
pub struct Credential {
    slot: usize,
    token: Secret<String>,
}

impl Credential {
    /// Zero-based position in the credential file. Used in logs instead of the token.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// The raw token for the outbound request.
    pub fn token(&self) -> &str {
        self.token.expose()
    }
}

/// Pool counts for startup logs and the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub total: usize,
    pub in_rotation: usize,
    pub idle: usize,
    pub exhausted: usize,
}

struct PoolState {
    idle: VecDeque<Credential>,
    /// Idle plus checked out. Never increases.
    in_rotation: usize,
}

/// Thread-safe rotating set of access credentials.
pub struct CredentialPool {
    state: Mutex<PoolState>,
    available: Notify,
    total: usize,
}

impl CredentialPool {
    /// Build a pool from tokens in their configured order.
    pub fn new(tokens: Vec<String>) -> Self {
        let idle: VecDeque<Credential> = tokens
            .into_iter()
            .enumerate()
            .map(|(slot, token)| Credential {
                slot,
                token: Secret::new(token),
            })
            .collect();
        let total = idle.len();
        metrics::gauge!("classifier_credentials_in_rotation").set(total as f64);
        info!(credentials = total, "credential pool initialized");
        Self {
            state: Mutex::new(PoolState {
                idle,
                in_rotation: total,
            }),
            available: Notify::new(),
            total,
        }
    }

    /// Load a newline-delimited credential file.
    ///
    /// Blank lines and lines starting with `#` are skipped. A file without
    /// any token is an error: the run could not make a single request.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::CredentialFile(format!("reading {}: {e}", path.display()))
        })?;
        let tokens = parse_tokens(&contents);
        if tokens.is_empty() {
            return Err(Error::NoCredentials(path.display().to_string()));
        }
        info!(path = %path.display(), credentials = tokens.len(), "loaded credentials");
        Ok(Self::new(tokens))
    }

    /// Number of credentials the pool started with.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Take the next idle credential.
    ///
    /// Waits while all in-rotation credentials are checked out. Returns
    /// `Error::Empty` without waiting once nothing remains in rotation.
    pub async fn acquire(&self) -> Result<Credential> {
        loop {
            let notified = self.available.notified();
            let mut notified = std::pin::pin!(notified);
            // Register before inspecting state so a release between the
            // check and the await is not missed.
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(credential) = state.idle.pop_front() {
                    debug!(slot = credential.slot, "credential acquired");
                    return Ok(credential);
                }
                if state.in_rotation == 0 {
                    return Err(Error::Empty {
                        total: self.total,
                        exhausted: self.total,
                    });
                }
            }

            debug!("all credentials checked out, waiting for release");
            notified.await;
        }
    }

    /// Return a credential to rotation after a request that did not hit quota.
    pub async fn release(&self, credential: Credential) {
        debug!(slot = credential.slot, "credential released");
        self.state.lock().await.idle.push_back(credential);
        self.available.notify_one();
    }

    /// Drop a credential from rotation for the rest of the run.
    ///
    /// Returns the number of credentials still in rotation.
    pub async fn mark_exhausted(&self, credential: Credential) -> usize {
        let remaining = {
            let mut state = self.state.lock().await;
            state.in_rotation -= 1;
            state.in_rotation
        };
        warn!(
            slot = credential.slot,
            remaining, "credential quota exhausted, removed from rotation"
        );
        metrics::counter!("classifier_credentials_exhausted_total").increment(1);
        metrics::gauge!("classifier_credentials_in_rotation").set(remaining as f64);
        // Wake every waiter: with nothing left in rotation they must all see Empty.
        self.available.notify_waiters();
        remaining
    }

    /// Credentials still in rotation (idle or checked out).
    pub async fn in_rotation(&self) -> usize {
        self.state.lock().await.in_rotation
    }

    /// Snapshot of pool counts.
    pub async fn status(&self) -> PoolStatus {
        let state = self.state.lock().await;
        PoolStatus {
            total: self.total,
            in_rotation: state.in_rotation,
            idle: state.idle.len(),
            exhausted: self.total - state.in_rotation,
        }
    }
}

/// Split credential file contents into tokens.
fn parse_tokens(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn pool_of(tokens: &[&str]) -> CredentialPool {
        CredentialPool::new(tokens.iter().map(|t| t.to_string()).collect())
    }

    #[tokio::test]
    async fn acquire_follows_configured_order() {
        let pool = pool_of(&["key-a", "key-b"]);
        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        assert_eq!(first.token(), "key-a");
        assert_eq!(first.slot(), 0);
        assert_eq!(second.token(), "key-b");
        assert_eq!(second.slot(), 1);
    }

    #[tokio::test]
    async fn release_rotates_to_back_of_queue() {
        let pool = pool_of(&["key-a", "key-b"]);
        let a = pool.acquire().await.unwrap();
        pool.release(a).await;

        let next = pool.acquire().await.unwrap();
        assert_eq!(next.token(), "key-b");
        let after = pool.acquire().await.unwrap();
        assert_eq!(after.token(), "key-a");
    }

    #[tokio::test]
    async fn exhausted_credential_never_returns() {
        let pool = pool_of(&["key-a", "key-b"]);
        let a = pool.acquire().await.unwrap();
        assert_eq!(pool.mark_exhausted(a).await, 1);

        for _ in 0..5 {
            let c = pool.acquire().await.unwrap();
            assert_eq!(c.token(), "key-b");
            pool.release(c).await;
        }
    }

    #[tokio::test]
    async fn in_rotation_strictly_decreases_on_exhaustion() {
        let pool = pool_of(&["a", "b", "c"]);
        let mut previous = pool.in_rotation().await;
        assert_eq!(previous, 3);

        for _ in 0..3 {
            let c = pool.acquire().await.unwrap();
            let remaining = pool.mark_exhausted(c).await;
            assert_eq!(remaining, previous - 1);
            assert_eq!(pool.in_rotation().await, remaining);
            previous = remaining;
        }
        assert_eq!(previous, 0);
    }

    #[tokio::test]
    async fn release_does_not_change_in_rotation() {
        let pool = pool_of(&["a", "b"]);
        let c = pool.acquire().await.unwrap();
        assert_eq!(pool.in_rotation().await, 2);
        pool.release(c).await;
        assert_eq!(pool.in_rotation().await, 2);
    }

    #[tokio::test]
    async fn fully_exhausted_pool_returns_empty_without_waiting() {
        let pool = pool_of(&["a"]);
        let c = pool.acquire().await.unwrap();
        pool.mark_exhausted(c).await;

        let result = tokio::time::timeout(Duration::from_millis(100), pool.acquire())
            .await
            .expect("acquire on an empty pool must not block");
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            Error::Empty {
                total: 1,
                exhausted: 1
            }
        ));
    }

    #[tokio::test]
    async fn pool_without_tokens_is_empty() {
        let pool = pool_of(&[]);
        assert_eq!(pool.total(), 0);
        assert!(matches!(pool.acquire().await, Err(Error::Empty { .. })));
    }

    #[tokio::test]
    async fn contended_acquire_waits_for_release() {
        let pool = Arc::new(pool_of(&["only"]));
        let held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "waiter should block while the credential is held");

        pool.release(held).await;
        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after release")
            .unwrap()
            .unwrap();
        assert_eq!(got.token(), "only");
    }

    #[tokio::test]
    async fn waiters_see_empty_when_last_credential_is_exhausted() {
        let pool = Arc::new(pool_of(&["only"]));
        let held = pool.acquire().await.unwrap();

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let pool = pool.clone();
            waiters.push(tokio::spawn(async move { pool.acquire().await }));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        pool.mark_exhausted(held).await;

        for waiter in waiters {
            let result = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should wake on exhaustion")
                .unwrap();
            assert!(matches!(result, Err(Error::Empty { .. })));
        }
    }

    #[tokio::test]
    async fn concurrent_acquire_release_keeps_every_credential() {
        let pool = Arc::new(pool_of(&["a", "b", "c"]));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let c = pool.acquire().await.unwrap();
                    tokio::task::yield_now().await;
                    pool.release(c).await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let status = pool.status().await;
        assert_eq!(status.idle, 3);
        assert_eq!(status.in_rotation, 3);
        assert_eq!(status.exhausted, 0);
    }

    #[tokio::test]
    async fn status_reports_checked_out_and_exhausted() {
        let pool = pool_of(&["a", "b", "c"]);
        let a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();
        pool.mark_exhausted(a).await;

        let status = pool.status().await;
        assert_eq!(
            status,
            PoolStatus {
                total: 3,
                in_rotation: 2,
                idle: 1,
                exhausted: 1,
            }
        );
    }

    #[test]
    fn parse_tokens_skips_blanks_and_comments() {
        let tokens = parse_tokens("# project keys\nkey-1\n\n  key-2  \n#key-3\n");
        assert_eq!(tokens, vec!["key-1", "key-2"]);
    }

    #[tokio::test]
    async fn load_reads_tokens_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        tokio::fs::write(&path, "key-1\nkey-2\n").await.unwrap();

        let pool = CredentialPool::load(&path).await.unwrap();
        assert_eq!(pool.total(), 2);
        assert_eq!(pool.acquire().await.unwrap().token(), "key-1");
    }

    #[tokio::test]
    async fn load_rejects_file_without_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        tokio::fs::write(&path, "# nothing here\n\n").await.unwrap();

        let err = CredentialPool::load(&path).await.err().unwrap();
        assert!(matches!(err, Error::NoCredentials(_)));
    }

    #[tokio::test]
    async fn load_missing_file_errors() {
        let err = CredentialPool::load(Path::new("/nonexistent/keys.txt"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::CredentialFile(_)));
    }
}
