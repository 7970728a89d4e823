//! Fixed-interval wakeups for the engine's update loop.
//!
//! The lobby protocol is mostly timer driven: re-announcements, liveness
//! pruning, join timeouts and the start countdown all happen in
//! `update()`, whether or not anything arrived on the network. The
//! scheduler wakes the loop at a steady interval with a little initial
//! jitter, so a room full of machines switched on together doesn't
//! announce in lockstep.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Milliseconds between updates.
    pub interval_ms: u64,
    /// Fraction of the interval an update may take before a warning
    /// is logged.
    pub budget_warn_threshold: f64,
    /// Upper bound of the random delay added to the first wakeup.
    pub initial_jitter_ms: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            budget_warn_threshold: 0.5,
            initial_jitter_ms: 20,
        }
    }
}

impl UpdateConfig {
    pub const MIN_INTERVAL_MS: u64 = 10;
    pub const MAX_INTERVAL_MS: u64 = 10_000;

    pub fn with_interval(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ..Default::default()
        }
    }

    /// Clamps the interval to `MIN_INTERVAL_MS..=MAX_INTERVAL_MS` and the
    /// threshold to `0.0..=1.0`.
    pub fn validated(mut self) -> Self {
        let clamped = self
            .interval_ms
            .clamp(Self::MIN_INTERVAL_MS, Self::MAX_INTERVAL_MS);
        if clamped != self.interval_ms {
            warn!(
                interval_ms = self.interval_ms,
                clamped, "update interval out of range, clamping"
            );
            self.interval_ms = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Per-wakeup info
// ---------------------------------------------------------------------------

/// Returned by [`UpdateScheduler::wait_for_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    /// Starts at 1.
    pub number: u64,
    /// Woke more than a tenth of an interval after the deadline.
    pub late: bool,
    /// Whole intervals that passed without a wakeup.
    pub missed: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Wakes the update loop every `interval_ms`. After waking late, the
/// missed wakeups are dropped and the next interval counts from now.
pub struct UpdateScheduler {
    config: UpdateConfig,
    interval: Duration,
    count: u64,
    next: Instant,
    started: Option<Instant>,
}

impl UpdateScheduler {
    pub fn new(config: UpdateConfig) -> Self {
        let config = config.validated();
        let interval = config.interval();
        let jitter = if config.initial_jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..config.initial_jitter_ms))
        } else {
            Duration::ZERO
        };
        debug!(
            interval_ms = config.interval_ms,
            jitter_ms = jitter.as_millis() as u64,
            "update scheduler created"
        );
        Self {
            next: Instant::now() + interval + jitter,
            config,
            interval,
            count: 0,
            started: None,
        }
    }

    /// Sleeps until the next update is due.
    pub async fn wait_for_update(&mut self) -> UpdateInfo {
        let deadline = self.next;
        time::sleep_until(deadline).await;

        let now = Instant::now();
        self.count += 1;
        self.started = Some(now);

        let late_by = now.saturating_duration_since(deadline);
        let late = late_by > self.interval / 10;
        let missed = if late {
            (late_by.as_nanos() / self.interval.as_nanos()) as u64
        } else {
            0
        };
        if missed > 0 {
            warn!(update = self.count, missed, "update loop fell behind");
        }

        self.next = now + self.interval;
        trace!(update = self.count, late, "update due");

        UpdateInfo {
            number: self.count,
            late,
            missed,
        }
    }

    /// Marks the end of the work done for the current update.
    pub fn record_update_end(&mut self) {
        let Some(started) = self.started.take() else {
            return;
        };
        let elapsed = started.elapsed();
        let utilization = elapsed.as_secs_f64() / self.interval.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                update = self.count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                interval_ms = self.config.interval_ms,
                "update took a large share of its interval"
            );
        }
    }

    pub fn update_count(&self) -> u64 {
        self.count
    }
}
