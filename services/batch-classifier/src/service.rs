//! Run lifecycle state machine
//!
//! Pure transition function plus a shared controller. The controller is the
//! only mutable lifecycle state: workers poll it before each dequeue and the
//! signal listener drives it. Transitions are one-way, Running to
//! ShuttingDown, and repeated signals are no-ops.

use tokio::sync::watch;
use tracing::{info, warn};

/// Exit code for a run that processed every pending identifier.
pub const EXIT_COMPLETED: i32 = 0;

/// Exit code for a run stopped by a shutdown signal (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Workers keep dequeuing identifiers
    Running,
    /// No new identifiers are dispatched; in-flight work finishes
    ShuttingDown,
}

/// What the caller should do after a shutdown signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop dispatching new work
    StopDispatch,
    /// Shutdown already underway
    Ignore,
}

/// Transition on a shutdown signal.
pub fn on_shutdown_signal(phase: RunPhase) -> (RunPhase, SignalAction) {
    match phase {
        RunPhase::Running => (RunPhase::ShuttingDown, SignalAction::StopDispatch),
        RunPhase::ShuttingDown => (RunPhase::ShuttingDown, SignalAction::Ignore),
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every pending identifier was processed and persisted
    Completed,
    /// Shutdown stopped dispatch before the queue drained
    Interrupted,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => EXIT_COMPLETED,
            RunOutcome::Interrupted => EXIT_INTERRUPTED,
        }
    }
}

/// Shared shutdown flag with async notification.
#[derive(Debug)]
pub struct ShutdownController {
    phase: watch::Sender<RunPhase>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(RunPhase::Running);
        Self { phase }
    }

    /// Request shutdown. Returns true only for the call that moved the run
    /// out of `Running`.
    pub fn trigger(&self) -> bool {
        let stopped = self.phase.send_if_modified(|phase| {
            let (next, action) = on_shutdown_signal(*phase);
            *phase = next;
            action == SignalAction::StopDispatch
        });
        if stopped {
            info!("shutdown requested, no new identifiers will be dispatched");
        } else {
            warn!("shutdown already in progress");
        }
        stopped
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.phase() == RunPhase::ShuttingDown
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.phase.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|phase| *phase == RunPhase::ShuttingDown).await;
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn signal_moves_running_to_shutting_down() {
        assert_eq!(
            on_shutdown_signal(RunPhase::Running),
            (RunPhase::ShuttingDown, SignalAction::StopDispatch)
        );
    }

    #[test]
    fn repeated_signal_is_ignored() {
        assert_eq!(
            on_shutdown_signal(RunPhase::ShuttingDown),
            (RunPhase::ShuttingDown, SignalAction::Ignore)
        );
    }

    #[test]
    fn exit_codes_distinguish_interrupted_runs() {
        assert_eq!(RunOutcome::Completed.exit_code(), 0);
        assert_eq!(RunOutcome::Interrupted.exit_code(), 130);
        assert_ne!(
            RunOutcome::Completed.exit_code(),
            RunOutcome::Interrupted.exit_code()
        );
    }

    #[test]
    fn trigger_is_idempotent() {
        let controller = ShutdownController::new();
        assert_eq!(controller.phase(), RunPhase::Running);
        assert!(!controller.is_shutting_down());

        assert!(controller.trigger());
        assert!(controller.is_shutting_down());
        assert!(!controller.trigger());
        assert!(!controller.trigger());
        assert_eq!(controller.phase(), RunPhase::ShuttingDown);
    }

    #[tokio::test]
    async fn wait_resolves_after_trigger() {
        let controller = Arc::new(ShutdownController::new());
        let waiter = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        controller.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait() must resolve after trigger")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_stopping() {
        let controller = ShutdownController::new();
        controller.trigger();
        tokio::time::timeout(Duration::from_millis(100), controller.wait())
            .await
            .expect("wait() must not block after shutdown");
    }
}
