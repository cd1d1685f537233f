//! Cross-relay synchronisation.
//!
//! The coordinator decides which follow-up requests a status change implies
//! and owns the group lock.  It never issues those requests itself: the
//! service executes the returned [`SyncAction`] through its public entry
//! point while the re-entrancy guard is held, so nested requests do not
//! recurse back into the coordinator.
//!
//! | Mode        | On request for relay `n` → `status`                        |
//! |-------------|------------------------------------------------------------|
//! | `Any`       | nothing                                                    |
//! | `Same`      | every other relay → `status`                               |
//! | `First`     | `n == 0` only: every other relay → `status`                |
//! | `One`       | on: others off · off: relay `(n + 1) % len` on · lock group |
//! | `NoneOrOne` | on: others off · off: nothing · lock group                 |

use embassy_time::{Duration, Instant};
use log::info;

use super::{RelayId, RelayLock, RelayTable, SyncMode};

/// Follow-up work implied by a status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Request `status` on every relay except the source.
    Mirror { status: bool },
    /// Request off on every other relay, chaining the source behind any
    /// relay that is still physically on.  Locks the group afterwards.
    Exclusive,
    /// Request on for `next`, chained behind the source.  Locks the group.
    Handover { next: RelayId },
    /// Only lock the group.
    Lock,
}

impl SyncAction {
    pub fn locks_group(self) -> bool {
        !matches!(self, Self::Mirror { .. })
    }
}

/// Pure decision table.  `None` means no coordination applies.
pub fn plan(mode: SyncMode, source: RelayId, status: bool, len: usize) -> Option<SyncAction> {
    if len < 2 {
        return None;
    }
    match mode {
        SyncMode::Any => None,
        SyncMode::Same => Some(SyncAction::Mirror { status }),
        SyncMode::First if source == 0 => Some(SyncAction::Mirror { status }),
        SyncMode::First => None,
        SyncMode::One | SyncMode::NoneOrOne if status => Some(SyncAction::Exclusive),
        SyncMode::One => Some(SyncAction::Handover {
            next: (source + 1) % len,
        }),
        SyncMode::NoneOrOne => Some(SyncAction::Lock),
    }
}

pub struct SyncCoordinator {
    mode: SyncMode,
    interlock: Duration,
    active: bool,
    locked: bool,
    unlock_at: Option<Instant>,
}

impl SyncCoordinator {
    pub fn new(mode: SyncMode, interlock: Duration) -> Self {
        Self {
            mode,
            interlock,
            active: false,
            locked: false,
            unlock_at: None,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn interlock(&self) -> Duration {
        self.interlock
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Enter the coordinator for a request on `source`.
    ///
    /// Returns the action to execute, or `None` when nothing applies or a
    /// sync decision is already in progress.  A returned action must be
    /// followed by [`finish`](Self::finish).
    pub fn begin(&mut self, source: RelayId, status: bool, len: usize) -> Option<SyncAction> {
        if self.active {
            return None;
        }
        let action = plan(self.mode, source, status, len)?;
        self.active = true;
        Some(action)
    }

    /// Leave the coordinator, locking the group when the action asks for it.
    pub fn finish(&mut self, action: SyncAction, table: &mut RelayTable) {
        if action.locks_group() {
            self.lock_all(table);
        }
        self.active = false;
    }

    /// Chain `second` behind `first`: its flood window restarts at the
    /// moment `first` was requested and its delay covers the interlock and
    /// both relays' own delays, so the two physical transitions never
    /// overlap.
    pub fn chain(&self, table: &mut RelayTable, first: RelayId, second: RelayId) {
        let Some((start, first_delay)) = table.get(first).map(|r| (r.change_start, r.change_delay))
        else {
            return;
        };
        let interlock = self.interlock;
        if let Some(relay) = table.get_mut(second) {
            relay.flood.restart_at(start);
            relay.change_delay = interlock.max(first_delay).max(relay.change_delay);
        }
    }

    fn lock_all(&mut self, table: &mut RelayTable) {
        for relay in table.iter_mut() {
            relay.lock = RelayLock::forced(relay.target_status);
        }
        self.locked = true;
        self.unlock_at = None;
        info!("sync: group locked");
    }

    fn unlock_all(&mut self, table: &mut RelayTable) {
        for relay in table.iter_mut() {
            relay.lock = relay.boot_mode.lock();
        }
        self.locked = false;
        self.unlock_at = None;
        info!("sync: group unlocked");
    }

    /// Release the group lock once every relay has converged.  When the
    /// group settled all-off the release waits one more interlock delay.
    pub fn check_unlock(&mut self, table: &mut RelayTable, now: Instant) {
        if !self.locked {
            return;
        }

        if let Some(at) = self.unlock_at {
            if now >= at {
                self.unlock_all(table);
            }
            return;
        }

        if !table.converged() {
            return;
        }

        if table.all_off() && self.interlock.as_ticks() > 0 {
            self.unlock_at = Some(now + self.interlock);
        } else {
            self.unlock_all(table);
        }
    }
}
