//! Background eviction of idle rate limit buckets.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};

use crate::limiter::RateLimiter;

/// Reference policy: sweep every 5 minutes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Reference policy: evict buckets idle for over an hour.
pub const DEFAULT_IDLE_CUTOFF: Duration = Duration::from_secs(60 * 60);

/// Owned handle to the periodic eviction task.
///
/// The task runs until [`Sweeper::shutdown`] is called or the handle is
/// dropped; either way it cannot outlive its owner.
pub struct Sweeper {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns the eviction task. Every `interval` it removes buckets idle
    /// longer than `idle_cutoff` from `limiter`.
    pub fn spawn(limiter: Arc<RateLimiter>, interval: Duration, idle_cutoff: Duration) -> Self {
        if interval >= idle_cutoff {
            tracing::warn!(
                interval_secs = interval.as_secs(),
                idle_cutoff_secs = idle_cutoff.as_secs(),
                "sweep interval is not smaller than the idle cutoff; stale buckets will linger"
            );
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = sleep(interval) => {
                        let evicted = limiter.evict_idle(idle_cutoff);
                        if evicted > 0 {
                            tracing::debug!(
                                evicted,
                                tracked = limiter.tracked_keys(),
                                "evicted idle rate limit buckets"
                            );
                        }
                    }
                }
            }
            tracing::debug!("bucket sweeper stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signals the task to stop and waits for it to finish.
    pub async fn shutdown(self) {
        // The receiver may already be gone if the task finished on its own.
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}
