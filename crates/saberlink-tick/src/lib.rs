//! Fixed-interval driver for Saberlink background sweeps.
//!
//! Wraps a [`tokio::time::Interval`] with the bits the reaper needs on
//! top: a zero period means "never fire", missed ticks are skipped rather
//! than replayed in a burst, and sweeps that eat most of their period get
//! a warning in the logs.
//!
//! ```ignore
//! let mut scheduler = IntervalScheduler::every(Duration::from_secs(10));
//! loop {
//!     let tick = scheduler.wait_for_tick().await;
//!     sweep(&registry).await;
//!     scheduler.record_tick_end();
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Fraction of the period a sweep may use before it is logged as slow.
const SLOW_FRACTION: f64 = 0.8;

/// A fired tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based tick counter.
    pub number: u64,
    /// How far past its deadline the tick was observed.
    pub late_by: Duration,
}

pub struct IntervalScheduler {
    period: Duration,
    interval: Option<Interval>,
    ticks: u64,
    sweep_started: Option<Instant>,
}

impl IntervalScheduler {
    /// First tick fires one `period` from now. A zero period disables the
    /// scheduler.
    pub fn every(period: Duration) -> Self {
        let interval = (!period.is_zero()).then(|| {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        if interval.is_none() {
            tracing::debug!("interval scheduler disabled");
        }

        Self {
            period,
            interval,
            ticks: 0,
            sweep_started: None,
        }
    }

    /// Waits for the next deadline. Never resolves when disabled.
    ///
    /// Deadlines missed while the caller was busy are dropped; the next
    /// one lands back on the original grid.
    pub async fn wait_for_tick(&mut self) -> Tick {
        let Some(interval) = self.interval.as_mut() else {
            return std::future::pending().await;
        };

        let deadline = interval.tick().await;
        let now = Instant::now();
        let late_by = now.saturating_duration_since(deadline);
        self.ticks += 1;
        self.sweep_started = Some(now);

        if late_by >= self.period {
            tracing::warn!(
                tick = self.ticks,
                late_ms = late_by.as_millis() as u64,
                "scheduler fell behind, skipping missed ticks"
            );
        }

        Tick {
            number: self.ticks,
            late_by,
        }
    }

    /// Marks the end of the work started by the last tick and returns how
    /// long it took.
    ///
    /// Returns `None` when no tick is in progress.
    pub fn record_tick_end(&mut self) -> Option<Duration> {
        let took = self.sweep_started.take()?.elapsed();

        if took.as_secs_f64() >= self.period.as_secs_f64() * SLOW_FRACTION {
            tracing::warn!(
                tick = self.ticks,
                took_ms = took.as_millis() as u64,
                period_ms = self.period.as_millis() as u64,
                "sweep is using most of its period"
            );
        }
        Some(took)
    }
}
