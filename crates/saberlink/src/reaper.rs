//! Background eviction of pending sessions that never synced.
//!
//! A player who signs in but never completes an authenticated pose
//! exchange (or whose connection dropped, see the handler) stays pending.
//! Every `reap_interval` the reaper removes pending sessions silent for
//! longer than `idle_timeout`. Active players are never touched here:
//! their liveness comes from their connection.

use std::sync::Arc;

use saberlink_session::{SessionConfig, SessionRegistry};
use saberlink_tick::IntervalScheduler;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Periodic sweeper over the shared registry.
pub struct ExpiryReaper {
    registry: Arc<Mutex<SessionRegistry>>,
    config: SessionConfig,
}

impl ExpiryReaper {
    pub fn new(registry: Arc<Mutex<SessionRegistry>>, config: SessionConfig) -> Self {
        Self { registry, config }
    }

    /// One pass: evicts idle pending sessions, returns their usernames.
    pub async fn sweep(&self) -> Vec<String> {
        let mut registry = self.registry.lock().await;
        registry.expire_idle_pending(Instant::now(), self.config.idle_timeout)
    }

    /// Sweeps forever at the configured interval.
    ///
    /// Never returns on its own; the task ends when the runtime shuts down.
    pub async fn run(self) {
        let mut scheduler = IntervalScheduler::every(self.config.reap_interval);
        tracing::info!(
            interval_secs = self.config.reap_interval.as_secs(),
            idle_timeout_secs = self.config.idle_timeout.as_secs(),
            "expiry reaper started"
        );

        loop {
            let tick = scheduler.wait_for_tick().await;
            let evicted = self.sweep().await;
            let took = scheduler.record_tick_end().unwrap_or_default();

            if evicted.is_empty() {
                tracing::trace!(
                    tick = tick.number,
                    late_ms = tick.late_by.as_millis() as u64,
                    took_us = took.as_micros() as u64,
                    "reaper sweep: nothing to evict"
                );
            } else {
                tracing::debug!(
                    tick = tick.number,
                    count = evicted.len(),
                    took_us = took.as_micros() as u64,
                    "reaper sweep evicted pending sessions"
                );
            }
        }
    }

    /// Runs [`run`](Self::run) on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
