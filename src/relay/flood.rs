//! Per-relay flood protection.
//!
//! Counts requested flips inside a sliding window.  Once the count reaches
//! the threshold the change is postponed until the window runs out; it is
//! never dropped.

use embassy_time::{Duration, Instant};

/// Global flood limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodSettings {
    pub window: Duration,
    pub changes: u8,
}

impl Default for FloodSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(3),
            changes: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodWindow {
    start: Instant,
    count: u8,
}

impl Default for FloodWindow {
    fn default() -> Self {
        Self {
            start: Instant::from_ticks(0),
            count: 0,
        }
    }
}

impl FloodWindow {
    /// Count a flip requested at `now`.
    ///
    /// Returns the time left in the window when the threshold is reached;
    /// the caller raises the relay's `change_delay` to at least that value.
    pub fn record(&mut self, now: Instant, settings: FloodSettings) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.start);
        if self.count == 0 || elapsed > settings.window {
            self.start = now;
            self.count = 1;
        } else {
            self.count = self.count.saturating_add(1);
        }

        if self.count >= settings.changes {
            Some(settings.window.checked_sub(elapsed).unwrap_or(Duration::from_ticks(0)))
        } else {
            None
        }
    }

    /// Restart the window at `start` with one change counted.  Used when a
    /// sync decision chains this relay behind another one.
    pub fn restart_at(&mut self, start: Instant) {
        self.start = start;
        self.count = 1;
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn start(&self) -> Instant {
        self.start
    }
}
