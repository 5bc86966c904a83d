//! Run state of the gateway loop and interrupt handling.
//!
//! The loop runs while a shared counter equals [`RUNNING`]. Every shutdown
//! request increments it, so the value also records how many interrupts
//! arrived. Health state is kept alongside in an `ArcSwap` for lock-free
//! reads from other threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Counter value while the loop should keep running.
pub const RUNNING: u64 = 1;

/// Exit status used when a second interrupt aborts teardown.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Gateway health state.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Sockets are being bound.
    Starting,
    /// The loop is dispatching messages.
    Ready,
    /// Shutdown was requested; the loop exits at its next check.
    Draining,
    /// Sockets, context and plugin are released.
    Stopped,
}

/// Shared run flag plus health state.
#[derive(Debug)]
pub struct ShutdownController {
    run_state: AtomicU64,
    health_state: ArcSwap<HealthState>,
}

impl ShutdownController {
    /// Creates a controller that is running and `Starting`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_state: AtomicU64::new(RUNNING),
            health_state: ArcSwap::from_pointee(HealthState::Starting),
        }
    }

    /// Whether no shutdown has been requested yet.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_state.load(Ordering::Acquire) == RUNNING
    }

    /// Raw counter value: [`RUNNING`] plus the number of shutdown requests.
    #[must_use]
    pub fn run_state(&self) -> u64 {
        self.run_state.load(Ordering::Acquire)
    }

    /// Number of shutdown requests received.
    #[must_use]
    pub fn shutdown_requests(&self) -> u64 {
        self.run_state() - RUNNING
    }

    /// Requests shutdown. Returns the new counter value.
    pub fn trigger_shutdown(&self) -> u64 {
        self.health_state.store(Arc::new(HealthState::Draining));
        self.run_state.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Transitions to `Ready`, unless shutdown was already requested.
    pub fn set_ready(&self) {
        if self.is_running() {
            self.health_state.store(Arc::new(HealthState::Ready));
        }
    }

    /// Transitions to `Stopped`.
    pub fn set_stopped(&self) {
        self.health_state.store(Arc::new(HealthState::Stopped));
    }

    /// Returns the current health state.
    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for SIGINT or SIGTERM.
#[cfg(unix)]
async fn interrupted() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn interrupted() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Spawns the interrupt watcher.
///
/// The first interrupt requests shutdown; the loop notices it within one
/// poll interval. A second interrupt exits the process immediately with
/// [`FORCED_EXIT_CODE`].
pub fn spawn_signal_watcher(controller: Arc<ShutdownController>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = interrupted().await {
            warn!(error = %err, "cannot listen for interrupts");
            return;
        }
        let state = controller.trigger_shutdown();
        info!(run_state = state, "interrupt received, shutting down");

        if interrupted().await.is_ok() {
            warn!("second interrupt received, exiting immediately");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_running_and_starting() {
        let controller = ShutdownController::new();
        assert!(controller.is_running());
        assert_eq!(controller.run_state(), RUNNING);
        assert_eq!(controller.shutdown_requests(), 0);
        assert_eq!(controller.health_state(), HealthState::Starting);
    }

    #[test]
    fn trigger_shutdown_increments_counter() {
        let controller = ShutdownController::new();
        controller.set_ready();
        assert_eq!(controller.trigger_shutdown(), 2);
        assert!(!controller.is_running());
        assert_eq!(controller.health_state(), HealthState::Draining);

        assert_eq!(controller.trigger_shutdown(), 3);
        assert_eq!(controller.shutdown_requests(), 2);
    }

    #[test]
    fn set_ready_after_shutdown_keeps_draining() {
        let controller = ShutdownController::new();
        controller.trigger_shutdown();
        controller.set_ready();
        assert_eq!(controller.health_state(), HealthState::Draining);
    }

    #[test]
    fn health_state_transitions_starting_ready_draining_stopped() {
        let controller = ShutdownController::new();

        controller.set_ready();
        assert_eq!(controller.health_state(), HealthState::Ready);

        controller.trigger_shutdown();
        assert_eq!(controller.health_state(), HealthState::Draining);

        controller.set_stopped();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[test]
    fn shutdown_is_visible_across_threads() {
        let controller = Arc::new(ShutdownController::new());
        let remote = Arc::clone(&controller);
        std::thread::spawn(move || remote.trigger_shutdown())
            .join()
            .unwrap();
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn watcher_can_be_aborted_before_any_signal() {
        let controller = Arc::new(ShutdownController::new());
        let watcher = spawn_signal_watcher(Arc::clone(&controller));
        watcher.abort();
        assert!(watcher.await.unwrap_err().is_cancelled());
        assert!(controller.is_running());
    }
}
