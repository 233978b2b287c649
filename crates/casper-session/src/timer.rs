//! Cancellable fixed-delay reconnect timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// One pending reconnect at most.
///
/// Each arm bumps a generation number. The spawned task reports its
/// generation when it fires, and the owner drops ticks whose generation
/// is no longer current. Aborting the task covers the normal case; the
/// generation check covers a tick already sitting in the channel.
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl ReconnectTimer {
    /// Create a disarmed timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer, replacing any pending one. After `delay` the task
    /// sends its generation on `due_tx`.
    pub fn schedule(&mut self, delay: Duration, due_tx: mpsc::Sender<u64>) -> u64 {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(generation, "Reconnect timer fired");
            let _ = due_tx.send(generation).await;
        }));
        generation
    }

    /// Disarm the timer. Any tick already queued becomes stale.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Accept a tick if it belongs to the pending arm. Consumes the arm.
    pub fn take_due(&mut self, generation: u64) -> bool {
        if self.handle.is_some() && generation == self.generation {
            self.handle = None;
            true
        } else {
            false
        }
    }

    /// Whether a reconnect is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
