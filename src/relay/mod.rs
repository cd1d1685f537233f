//! Relay table: one record per physical or virtual output.
//!
//! ```text
//!            set_status()                   scheduler pass
//!   Idle  ─────────────────▶  Pending  ──────────────────────▶  Idle
//!  (current == target)       (current != target,              (provider.change()
//!                             waiting change_delay)             fired)
//! ```
//!
//! Records live in a fixed-capacity arena indexed by [`RelayId`].  Entries
//! are only ever appended, so an id stays valid for the process lifetime.

pub mod flood;
pub mod pulse;
pub mod sync;

use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

use crate::config::RelayConfig;
use crate::drivers::RelayProvider;

use self::flood::FloodWindow;

/// Boot mask width and table capacity.
pub const RELAYS_MAX: usize = 32;

/// Stable index of a relay within the [`RelayTable`].
pub type RelayId = usize;

// ───────────────────────────────────────────────────────────────
// Policy enums
// ───────────────────────────────────────────────────────────────

/// Auto-revert behaviour after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PulseMode {
    #[default]
    None,
    /// Relay normally rests off; turning it on arms a revert to off.
    Off,
    /// Relay normally rests on; turning it off arms a revert to on.
    On,
}

impl PulseMode {
    /// The status to restore after `status` was reached, if this mode
    /// considers `status` a temporary state.
    pub fn restore_for(self, status: bool) -> Option<bool> {
        match self {
            Self::None => None,
            Self::Off if status => Some(false),
            Self::On if !status => Some(true),
            Self::Off | Self::On => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Off => "off",
            Self::On => "on",
        }
    }
}

/// Forced value that overrides any contradicting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayLock {
    #[default]
    None,
    Off,
    On,
}

impl RelayLock {
    pub fn forced(status: bool) -> Self {
        if status { Self::On } else { Self::Off }
    }

    /// The locked value, or `None` when unlocked.
    pub fn value(self) -> Option<bool> {
        match self {
            Self::None => None,
            Self::Off => Some(false),
            Self::On => Some(true),
        }
    }

    /// Wire value used by the state snapshot: 0 unlocked, 1 off, 2 on.
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Off => 1,
            Self::On => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Off => "off",
            Self::On => "on",
        }
    }
}

/// Initial target policy applied at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BootMode {
    #[default]
    Off,
    On,
    /// Restore the persisted status.
    Same,
    /// Invert the persisted status.
    Toggle,
    /// Off, and locked off until reconfigured.
    LockedOff,
    /// On, and locked on until reconfigured.
    LockedOn,
}

impl BootMode {
    /// Resolve the boot target and lock from the persisted bit.
    pub fn resolve(self, persisted: bool) -> (bool, RelayLock) {
        match self {
            Self::Off => (false, RelayLock::None),
            Self::On => (true, RelayLock::None),
            Self::Same => (persisted, RelayLock::None),
            Self::Toggle => (!persisted, RelayLock::None),
            Self::LockedOff => (false, RelayLock::Off),
            Self::LockedOn => (true, RelayLock::On),
        }
    }

    /// Lock held outside of sync decisions.
    pub fn lock(self) -> RelayLock {
        match self {
            Self::LockedOff => RelayLock::Off,
            Self::LockedOn => RelayLock::On,
            _ => RelayLock::None,
        }
    }

    /// Whether transitions of this relay must survive a power loss.
    pub fn persists(self) -> bool {
        matches!(self, Self::Same | Self::Toggle)
    }
}

/// Cross-relay coordination policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncMode {
    #[default]
    Any,
    NoneOrOne,
    One,
    Same,
    First,
}

// ───────────────────────────────────────────────────────────────
// Relay record
// ───────────────────────────────────────────────────────────────

/// Pending report flags handed to transports once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportFlags {
    pub report: bool,
    pub group_report: bool,
}

impl ReportFlags {
    pub const BOTH: Self = Self {
        report: true,
        group_report: true,
    };

    pub fn is_pending(self) -> bool {
        self.report || self.group_report
    }
}

/// Per-relay state.  Fields are crate-private so that only the service
/// and the scheduler mutate `current_status` / `target_status` / `lock`.
pub struct Relay {
    pub(crate) provider: Box<dyn RelayProvider>,

    pub(crate) delay_on: Duration,
    pub(crate) delay_off: Duration,
    pub(crate) pulse: PulseMode,
    pub(crate) pulse_time: Duration,
    pub(crate) boot_mode: BootMode,

    pub(crate) flood: FloodWindow,
    pub(crate) change_start: Instant,
    pub(crate) change_delay: Duration,

    pub(crate) current_status: bool,
    pub(crate) target_status: bool,
    pub(crate) lock: RelayLock,
    pub(crate) report: ReportFlags,
    pub(crate) booted: bool,
}

impl Relay {
    pub fn new(provider: Box<dyn RelayProvider>) -> Self {
        Self {
            provider,
            delay_on: Duration::from_ticks(0),
            delay_off: Duration::from_ticks(0),
            pulse: PulseMode::None,
            pulse_time: Duration::from_ticks(0),
            boot_mode: BootMode::Off,
            flood: FloodWindow::default(),
            change_start: Instant::from_ticks(0),
            change_delay: Duration::from_ticks(0),
            current_status: false,
            target_status: false,
            lock: RelayLock::None,
            report: ReportFlags::default(),
            booted: false,
        }
    }

    /// Apply per-relay settings.  Does not touch status or lock.
    pub fn configure(&mut self, cfg: &RelayConfig) {
        self.delay_on = Duration::from_millis(u64::from(cfg.delay_on_ms));
        self.delay_off = Duration::from_millis(u64::from(cfg.delay_off_ms));
        self.pulse = cfg.pulse;
        self.pulse_time = Duration::from_millis(u64::from(cfg.pulse_time_ms));
        self.boot_mode = cfg.boot_mode;
    }

    /// Configured delay before reaching `status`.
    pub fn delay_for(&self, status: bool) -> Duration {
        if status { self.delay_on } else { self.delay_off }
    }

    /// A transition toward `target_status` is waiting.
    pub fn is_pending(&self) -> bool {
        self.current_status != self.target_status
    }

    /// Whether the pending transition may fire at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.change_delay.as_ticks() == 0
            || now.saturating_duration_since(self.change_start) > self.change_delay
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    pub fn current_status(&self) -> bool {
        self.current_status
    }

    pub fn target_status(&self) -> bool {
        self.target_status
    }

    pub fn lock(&self) -> RelayLock {
        self.lock
    }

    pub fn change_delay(&self) -> Duration {
        self.change_delay
    }

    pub fn pulse_mode(&self) -> PulseMode {
        self.pulse
    }

    pub fn pulse_time(&self) -> Duration {
        self.pulse_time
    }

    pub fn delay_on(&self) -> Duration {
        self.delay_on
    }

    pub fn delay_off(&self) -> Duration {
        self.delay_off
    }

    pub fn boot_mode(&self) -> BootMode {
        self.boot_mode
    }
}

// ───────────────────────────────────────────────────────────────
// Relay table
// ───────────────────────────────────────────────────────────────

/// Append-only arena of relays.
#[derive(Default)]
pub struct RelayTable {
    relays: heapless::Vec<Relay, RELAYS_MAX>,
}

impl RelayTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a relay.  Returns `None` when the table is full.
    pub fn push(&mut self, relay: Relay) -> Option<RelayId> {
        let id = self.relays.len();
        self.relays.push(relay).ok().map(|()| id)
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    pub fn get(&self, id: RelayId) -> Option<&Relay> {
        self.relays.get(id)
    }

    pub fn get_mut(&mut self, id: RelayId) -> Option<&mut Relay> {
        self.relays.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relay> {
        self.relays.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Relay> {
        self.relays.iter_mut()
    }

    /// `current_status` of `id`, `false` for unknown ids.
    pub fn current(&self, id: RelayId) -> bool {
        self.get(id).is_some_and(|r| r.current_status)
    }

    /// Every relay has reached its target.
    pub fn converged(&self) -> bool {
        self.relays.iter().all(|r| !r.is_pending())
    }

    /// Every relay is off.
    pub fn all_off(&self) -> bool {
        self.relays.iter().all(|r| !r.current_status)
    }
}
