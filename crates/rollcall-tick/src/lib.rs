//! Fixed-period rotation scheduler for Rollcall.
//!
//! Drives token rotation for a live attendance session. Ticks are
//! anchored to the instant the session was created: tick *k* is due at
//! `anchor + k * period`, independent of how long the previous tick took
//! to process.
//!
//! # Integration
//!
//! The scheduler sits inside the session store's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         biased;
//!         info = scheduler.wait_for_tick() => rotate(info),
//!         Some(cmd) = cmd_rx.recv() => handle(cmd),
//!     }
//! }
//! ```
//!
//! [`TickScheduler::wait_for_tick`] is cancel-safe: its state only
//! changes after the sleep completes, so losing a `select!` race never
//! skips or duplicates a tick. [`TickScheduler::fire_if_due`] is the
//! non-waiting form for callers that need to catch up before acting.
//!
//! All timing uses `tokio::time`, so tests drive the scheduler with
//! `tokio::time::pause()` / `advance()` instead of real waits.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the scheduler wakes up after one or more ticks were due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Fire once, count the missed ticks as skipped, and stay on the
    /// original grid (`anchor + k * period`).
    #[default]
    Skip,
    /// Fire every missed tick back to back until caught up.
    /// Each missed rotation still happens, just late.
    Drop,
}

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks.
    pub period: Duration,
    /// What to do after falling behind.
    pub policy: TickPolicy,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            policy: TickPolicy::default(),
        }
    }
}

impl TickConfig {
    /// Shortest period the scheduler accepts.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    /// Create a config for a specific period with default policy.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. A period below
    /// [`Self::MIN_PERIOD`] is raised to it.
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_millis() as u64,
                min_ms = Self::MIN_PERIOD.as_millis() as u64,
                "tick period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Fired ticks
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Rotation number; the first tick is 1.
    pub tick: u64,
    /// The grid instant this tick was due at.
    pub scheduled_at: Instant,
    /// `true` if the tick fired more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods skipped under [`TickPolicy::Skip`] (0 normally).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Ticks that fired late.
    pub total_overruns: u64,
    /// Ticks skipped under [`TickPolicy::Skip`].
    pub total_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period scheduler anchored at a start instant.
///
/// One scheduler per live session; dropping it is how its ticks are
/// cancelled.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// Grid instant of the next tick.
    next_tick: Instant,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a scheduler whose grid starts now.
    pub fn new(config: TickConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    /// Create a scheduler whose first tick is due at `anchor + period`.
    pub fn starting_at(config: TickConfig, anchor: Instant) -> Self {
        let config = config.validated();
        let next_tick = anchor + config.period;

        debug!(
            period_ms = config.period.as_millis() as u64,
            policy = ?config.policy,
            "tick scheduler created"
        );

        Self {
            config,
            tick_count: 0,
            next_tick,
            metrics: TickMetrics::default(),
        }
    }

    /// Create a scheduler for a specific period with default settings.
    pub fn with_period(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Sleeps until the next grid instant, then fires that tick.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        time::sleep_until(self.next_tick).await;
        self.fire(Instant::now())
    }

    /// Fire the next tick without waiting, if it is due at `now`.
    ///
    /// Lets a caller commit ticks that have logically occurred before
    /// acting on other input, even if the timer wakeup hasn't been
    /// delivered yet.
    pub fn fire_if_due(&mut self, now: Instant) -> Option<TickInfo> {
        (now >= self.next_tick).then(|| self.fire(now))
    }

    fn fire(&mut self, now: Instant) -> TickInfo {
        let due = self.next_tick;
        let period = self.config.period;
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
                if ticks_skipped > 0 {
                    warn!(
                        tick = self.tick_count,
                        skipped = ticks_skipped,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, skipping ahead on grid"
                    );
                }
                due + period * (ticks_skipped as u32 + 1)
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, next tick stays on original schedule"
                    );
                }
                due + period
            }
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            scheduled_at: due,
            overrun,
            ticks_skipped,
        }
    }

    /// Grid instant of the next tick.
    pub fn next_deadline(&self) -> Instant {
        self.next_tick
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn policy(&self) -> TickPolicy {
        self.config.policy
    }
}
