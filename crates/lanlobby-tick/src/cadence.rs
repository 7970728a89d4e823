//! Periodic actions driven by an external clock reading.

/// Fires at most once per `period_ms`.
///
/// A fresh cadence fires on its first check. After that it fires again
/// once `period_ms` has passed since the last time it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    period_ms: u64,
    last: Option<u64>,
}

impl Cadence {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last: None,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Returns `true` (and restarts the period) if the cadence is due.
    pub fn due(&mut self, now_ms: u64) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.period_ms,
        };
        if due {
            self.last = Some(now_ms);
        }
        due
    }

    /// Restarts the period without firing.
    pub fn reset(&mut self, now_ms: u64) {
        self.last = Some(now_ms);
    }

    /// Makes the next check fire regardless of elapsed time.
    pub fn force(&mut self) {
        self.last = None;
    }
}
