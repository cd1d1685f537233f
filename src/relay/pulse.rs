//! Pulse timer registry.
//!
//! One-shot per-relay timers that restore a relay's status after an
//! interval.  Hardware one-shot timers cap out at [`ONESHOT_MAX`]; longer
//! pulses are realised by re-arming in capped chunks until the cumulative
//! elapsed time reaches the requested duration.
//!
//! The registry only keeps time.  [`PulseRegistry::tick`] hands fired
//! `(relay, target)` pairs back to the service, which routes them through
//! the normal status-setting entry point.

use embassy_time::{Duration, Instant};
use log::{debug, info};

use super::{RelayId, RelayTable, RELAYS_MAX};

/// Longest single arm of the one-shot timer.
pub const ONESHOT_MAX: Duration = Duration::from_millis(0x68D_7A3 - 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PulseTimer {
    relay_id: RelayId,
    target: bool,
    duration: Duration,
    /// Sum of completed chunks.
    elapsed: Duration,
    armed_at: Instant,
    interval: Duration,
}

impl PulseTimer {
    fn arm(&mut self, now: Instant, max_interval: Duration) {
        self.elapsed = Duration::from_ticks(0);
        self.armed_at = now;
        self.interval = self.duration.min(max_interval);
    }
}

/// A timer that fired and must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredPulse {
    pub relay_id: RelayId,
    pub target: bool,
}

pub struct PulseRegistry {
    timers: heapless::Vec<PulseTimer, RELAYS_MAX>,
    max_interval: Duration,
}

impl Default for PulseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseRegistry {
    pub fn new() -> Self {
        Self::with_max_interval(ONESHOT_MAX)
    }

    /// Registry whose single arm is capped at `max_interval`.
    pub fn with_max_interval(max_interval: Duration) -> Self {
        Self {
            timers: heapless::Vec::new(),
            max_interval: max_interval.max(Duration::from_ticks(1)),
        }
    }

    fn find(&self, relay_id: RelayId) -> Option<usize> {
        self.timers.iter().position(|t| t.relay_id == relay_id)
    }

    /// Arm a timer that sets `relay_id` to `target` after `duration`.
    ///
    /// An existing timer for the relay is replaced when its target differs,
    /// rescheduled when only the duration differs, and restarted otherwise.
    pub fn trigger(&mut self, duration: Duration, relay_id: RelayId, target: bool, now: Instant) {
        if let Some(index) = self.find(relay_id) {
            let timer = &mut self.timers[index];
            if timer.target != target {
                debug!("pulse: relay{} replacing timer", relay_id);
                timer.target = target;
            } else if timer.duration != duration {
                debug!("pulse: relay{} rescheduling timer", relay_id);
            }
            timer.duration = duration;
            timer.arm(now, self.max_interval);
        } else {
            let mut timer = PulseTimer {
                relay_id,
                target,
                duration,
                elapsed: Duration::from_ticks(0),
                armed_at: now,
                interval: Duration::from_ticks(0),
            };
            timer.arm(now, self.max_interval);
            // One slot per relay id, so the registry cannot overflow.
            let _ = self.timers.push(timer);
        }

        info!(
            "pulse: relay{} scheduled {} after {}ms",
            relay_id,
            if target { "ON" } else { "OFF" },
            duration.as_millis()
        );
    }

    /// Restart the clock of a timer whose relay was observed in a status
    /// other than the timer's target.
    pub fn poll(&mut self, relay_id: RelayId, observed: bool, now: Instant) {
        let max = self.max_interval;
        if let Some(timer) = self.timers.iter_mut().find(|t| t.relay_id == relay_id) {
            if timer.target != observed {
                timer.arm(now, max);
            }
        }
    }

    /// Advance every timer to `now` and collect the ones that fired.
    pub fn tick(&mut self, now: Instant) -> heapless::Vec<FiredPulse, RELAYS_MAX> {
        let mut fired = heapless::Vec::new();
        let max = self.max_interval;

        self.timers.retain_mut(|timer| {
            while now.saturating_duration_since(timer.armed_at) >= timer.interval {
                timer.elapsed += timer.interval;
                timer.armed_at += timer.interval;

                let Some(remaining) = timer.duration.checked_sub(timer.elapsed) else {
                    break;
                };
                if remaining.as_ticks() == 0 {
                    break;
                }
                timer.interval = remaining.min(max);
                debug!(
                    "pulse: relay{} re-arming, {}ms left",
                    timer.relay_id,
                    remaining.as_millis()
                );
            }

            if timer.elapsed >= timer.duration {
                let _ = fired.push(FiredPulse {
                    relay_id: timer.relay_id,
                    target: timer.target,
                });
                false
            } else {
                true
            }
        });

        fired
    }

    /// Drop timers whose relay already rests at the timer's target, or
    /// whose relay no longer exists.
    pub fn expire(&mut self, table: &RelayTable) {
        self.timers.retain(|timer| match table.get(timer.relay_id) {
            Some(relay) => {
                !(relay.current_status == timer.target && relay.target_status == timer.target)
            }
            None => false,
        });
    }

    pub fn contains(&self, relay_id: RelayId) -> bool {
        self.find(relay_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
