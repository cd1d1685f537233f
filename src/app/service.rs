//! Application service, the hexagonal core.
//!
//! [`RelayService`] owns the relay table and every piece of state that
//! coordinates it: flood settings, the sync coordinator, the pulse timer
//! registry, and the persistence layer.  Transports call its public API;
//! the main loop calls [`tick`](RelayService::tick) once per iteration.
//!
//! ```text
//!  transports ──▶ ┌──────────────────────────────┐ ──▶ observers
//!  (set_status,   │         RelayService          │
//!   pulse, ...)   │ table · sync · pulse · flood  │ ──▶ providers
//!                 └──────────────┬───────────────┘
//!                                ▼
//!                  Persistence (fast + durable mask)
//! ```

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{RelayConfig, SystemConfig};
use crate::drivers::RelayProvider;
use crate::persistence::{BootMask, Persistence};
use crate::relay::flood::FloodSettings;
use crate::relay::pulse::PulseRegistry;
use crate::relay::sync::{SyncAction, SyncCoordinator};
use crate::relay::{Relay, RelayId, RelayTable, ReportFlags, RELAYS_MAX};
use crate::scheduler::{self, Transition};

use super::commands::{self, CustomPayloads, PayloadStatus};
use super::ports::Clock;

/// Observer of relay status.
pub type StatusCallback = Box<dyn FnMut(RelayId, bool)>;

fn on_off(status: bool) -> &'static str {
    if status { "ON" } else { "OFF" }
}

/// Snapshot pushed to web clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayStateReport {
    pub size: usize,
    pub status: heapless::Vec<u8, RELAYS_MAX>,
    /// 0 unlocked, 1 forced off, 2 forced on.
    pub lock: heapless::Vec<u8, RELAYS_MAX>,
}

// ───────────────────────────────────────────────────────────────
// RelayService
// ───────────────────────────────────────────────────────────────

pub struct RelayService<C: Clock> {
    clock: C,
    config: SystemConfig,
    table: RelayTable,
    flood: FloodSettings,
    sync: SyncCoordinator,
    pulses: PulseRegistry,
    persistence: Persistence,
    /// Set once [`boot`](Self::boot) has run; later relays boot on add.
    boot_mask: Option<BootMask>,
    notify_observers: Vec<StatusCallback>,
    change_observers: Vec<StatusCallback>,
}

impl<C: Clock> RelayService<C> {
    /// Construct the service.  No relays yet: add them with
    /// [`add_relay`](Self::add_relay), then call [`boot`](Self::boot).
    pub fn new(config: SystemConfig, clock: C, persistence: Persistence) -> Self {
        let flood = FloodSettings {
            window: Duration::from_millis(u64::from(config.flood_window_ms)),
            changes: config.flood_changes,
        };
        let sync = SyncCoordinator::new(
            config.sync_mode,
            Duration::from_millis(u64::from(config.interlock_delay_ms)),
        );

        Self {
            clock,
            config,
            table: RelayTable::new(),
            flood,
            sync,
            pulses: PulseRegistry::new(),
            persistence,
            boot_mask: None,
            notify_observers: Vec::new(),
            change_observers: Vec::new(),
        }
    }

    /// Replace the pulse registry (e.g. one with a shorter one-shot cap).
    pub fn with_pulse_registry(mut self, pulses: PulseRegistry) -> Self {
        self.pulses = pulses;
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Register a relay driven by `provider`, configured from the entry at
    /// its table index.
    pub fn add_relay(&mut self, provider: Box<dyn RelayProvider>) -> Option<RelayId> {
        let cfg = self.config.relay(self.table.len());
        self.add_relay_with(provider, &cfg)
    }

    /// Register a relay driven by `provider` with explicit settings.
    ///
    /// The provider is set up first and dropped if setup fails.  Relays
    /// added after [`boot`](Self::boot) are booted immediately.
    pub fn add_relay_with(
        &mut self,
        mut provider: Box<dyn RelayProvider>,
        cfg: &RelayConfig,
    ) -> Option<RelayId> {
        let kind = provider.id();
        if !provider.setup() {
            warn!("relay: {} provider setup failed", kind);
            return None;
        }

        let mut relay = Relay::new(provider);
        relay.configure(cfg);
        let Some(id) = self.table.push(relay) else {
            warn!("relay: table full, dropping {} relay", kind);
            return None;
        };
        info!("relay{}: added ({})", id, kind);

        if let Some(mask) = self.boot_mask {
            let now = self.clock.now();
            self.boot_relay(id, mask, now);
        }
        Some(id)
    }

    /// Resolve every relay's boot policy against the persisted mask.
    pub fn boot(&mut self) {
        let (mask, source) = self.persistence.read_boot_mask();
        info!(
            "Boot: {} relays, mask {:#b} ({:?})",
            self.table.len(),
            mask.bits(),
            source
        );
        self.boot_mask = Some(mask);

        let now = self.clock.now();
        for id in 0..self.table.len() {
            self.boot_relay(id, mask, now);
        }
    }

    fn boot_relay(&mut self, id: RelayId, mask: BootMask, now: Instant) {
        let Some(relay) = self.table.get_mut(id) else {
            return;
        };
        if relay.booted {
            return;
        }

        let (status, lock) = relay.boot_mode.resolve(mask.get(id));
        // Opposite current status: the first pass drives the output to a
        // known level.
        relay.current_status = !status;
        relay.target_status = status;
        relay.lock = lock;
        relay.change_start = now;
        relay.change_delay = relay.delay_for(status);
        if let Some(settle) = relay.provider.boot(status) {
            relay.change_delay = relay.change_delay.max(settle);
        }
        relay.booted = true;

        debug!(
            "relay{}: boot {:?} → {} (delay {}ms)",
            id,
            relay.boot_mode,
            on_off(status),
            relay.change_delay.as_millis()
        );
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn count(&self) -> usize {
        self.table.len()
    }

    /// Physical status; `false` for unknown ids.
    pub fn status(&self, id: RelayId) -> bool {
        self.table.current(id)
    }

    /// Requested status; `false` for unknown ids.
    pub fn target_status(&self, id: RelayId) -> bool {
        self.table.get(id).is_some_and(Relay::target_status)
    }

    pub fn relay(&self, id: RelayId) -> Option<&Relay> {
        self.table.get(id)
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn is_sync_locked(&self) -> bool {
        self.sync.is_locked()
    }

    pub fn pending_pulses(&self) -> usize {
        self.pulses.len()
    }

    pub fn state_report(&self) -> RelayStateReport {
        let mut report = RelayStateReport {
            size: self.table.len(),
            status: heapless::Vec::new(),
            lock: heapless::Vec::new(),
        };
        for relay in self.table.iter() {
            let _ = report.status.push(u8::from(relay.current_status));
            let _ = report.lock.push(relay.lock.code());
        }
        report
    }

    /// Hand out and clear the pending report flags of `id`.
    pub fn take_report(&mut self, id: RelayId) -> Option<ReportFlags> {
        let relay = self.table.get_mut(id)?;
        let flags = core::mem::take(&mut relay.report);
        flags.is_pending().then_some(flags)
    }

    // ── Status requests ───────────────────────────────────────

    /// Request `status` for `id` with default report flags.
    pub fn set_status(&mut self, id: RelayId, status: bool) -> bool {
        self.set_status_with(id, status, false, true)
    }

    /// Request `status` for `id`.
    ///
    /// Returns `true` when a transition was scheduled or a pending one was
    /// cancelled.  Unknown ids, locked relays, and requests that match the
    /// relay's current or already-pending status return `false`.
    pub fn set_status_with(
        &mut self,
        id: RelayId,
        status: bool,
        report: bool,
        group_report: bool,
    ) -> bool {
        let now = self.clock.now();
        let flood = self.flood;
        let Some(relay) = self.table.get_mut(id) else {
            return false;
        };

        if let Some(locked) = relay.lock.value() {
            if locked != status {
                relay.report = ReportFlags::BOTH;
                info!("relay{}: locked {}, ignoring {}", id, on_off(locked), on_off(status));
                return false;
            }
        }

        if relay.current_status == status {
            let mut changed = false;
            if relay.target_status != status {
                info!("relay{}: cancelled pending {}", id, on_off(relay.target_status));
                relay.target_status = status;
                relay.report = ReportFlags::default();
                relay.change_delay = Duration::from_ticks(0);
                changed = true;
            }
            relay.provider.notify(status);
            self.pulses.poll(id, status, now);
            self.notify(id, status);
            return changed;
        }

        if relay.target_status == status {
            return false;
        }

        relay.change_start = now;
        relay.change_delay = relay.change_delay.max(relay.delay_for(status));
        if let Some(remaining) = relay.flood.record(now, flood) {
            relay.change_delay = relay.change_delay.max(remaining);
            warn!(
                "relay{}: flood protection, postponed {}ms",
                id,
                relay.change_delay.as_millis()
            );
        }
        relay.target_status = status;
        relay.report = ReportFlags {
            report,
            group_report,
        };
        info!(
            "relay{}: scheduled {} in {}ms",
            id,
            on_off(status),
            relay.change_delay.as_millis()
        );

        self.sync(id, status);
        self.notify(id, status);
        true
    }

    /// Request the opposite of the current status.
    pub fn toggle(&mut self, id: RelayId) -> bool {
        self.toggle_with(id, false, true)
    }

    pub fn toggle_with(&mut self, id: RelayId, report: bool, group_report: bool) -> bool {
        let Some(relay) = self.table.get(id) else {
            return false;
        };
        let status = !relay.current_status;
        self.set_status_with(id, status, report, group_report)
    }

    /// Set `id` to `initial` (default: the opposite of its current status)
    /// and arm a timer that restores the opposite after `duration`.
    pub fn pulse(&mut self, id: RelayId, duration: Duration, initial: Option<bool>) -> bool {
        let Some(relay) = self.table.get(id) else {
            return false;
        };
        if duration.as_ticks() == 0 {
            return false;
        }

        let status = initial.unwrap_or(!relay.current_status);
        self.set_status(id, status);
        if self.target_status(id) != status {
            // Rejected by a lock.
            return false;
        }

        let now = self.clock.now();
        self.pulses.trigger(duration, id, !status, now);
        true
    }

    /// Apply a parsed payload.  `Unknown` is ignored.
    pub fn apply_payload(&mut self, id: RelayId, payload: PayloadStatus) -> bool {
        match payload {
            PayloadStatus::Off => self.set_status(id, false),
            PayloadStatus::On => self.set_status(id, true),
            PayloadStatus::Toggle => self.toggle(id),
            PayloadStatus::Unknown => false,
        }
    }

    /// Canonical text-to-command mapping with the configured payloads.
    pub fn parse_payload(&self, text: &str) -> PayloadStatus {
        commands::parse_payload(text, Some(&CustomPayloads::from_config(&self.config)))
    }

    /// Text transports publish for `status`.
    pub fn payload_for(&self, status: bool) -> &str {
        let payload = if status { PayloadStatus::On } else { PayloadStatus::Off };
        commands::payload_for(payload, &CustomPayloads::from_config(&self.config))
    }

    // ── Observers ─────────────────────────────────────────────

    /// Called for every request and every fired transition.
    pub fn on_status_notify(&mut self, callback: impl FnMut(RelayId, bool) + 'static) {
        self.notify_observers.push(Box::new(callback));
    }

    /// Called only when a relay's physical status flips.
    pub fn on_status_change(&mut self, callback: impl FnMut(RelayId, bool) + 'static) {
        self.change_observers.push(Box::new(callback));
    }

    fn notify(&mut self, id: RelayId, status: bool) {
        for observer in &mut self.notify_observers {
            observer(id, status);
        }
    }

    // ── Persistence ───────────────────────────────────────────

    /// Write the current status mask now.  `persist` also updates the
    /// durable copy.
    pub fn save(&mut self, persist: bool) {
        let mask = BootMask::from_table(&self.table);
        self.persistence.write(mask, persist);
    }

    // ── Sync ──────────────────────────────────────────────────

    fn sync(&mut self, source: RelayId, status: bool) {
        let Some(action) = self.sync.begin(source, status, self.table.len()) else {
            return;
        };
        debug!("sync: relay{} {} → {:?}", source, on_off(status), action);

        match action {
            SyncAction::Mirror { status } => {
                for id in (0..self.table.len()).filter(|&id| id != source) {
                    self.set_status(id, status);
                }
            }
            SyncAction::Exclusive => {
                for id in (0..self.table.len()).filter(|&id| id != source) {
                    self.set_status(id, false);
                    if self.table.current(id) {
                        self.sync.chain(&mut self.table, id, source);
                    }
                }
            }
            SyncAction::Handover { next } => {
                self.sync.chain(&mut self.table, source, next);
                self.set_status(next, true);
            }
            SyncAction::Lock => {}
        }

        self.sync.finish(action, &mut self.table);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control-loop iteration.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        for fired in self.pulses.tick(now) {
            info!("pulse: relay{} → {}", fired.relay_id, on_off(fired.target));
            self.set_status(fired.relay_id, fired.target);
        }

        for transition in scheduler::run(&mut self.table, now) {
            self.on_transition(transition, now);
        }

        self.pulses.expire(&self.table);
        self.sync.check_unlock(&mut self.table, now);

        if let Some(persist) = self.persistence.take_due(now) {
            self.save(persist);
        }
    }

    fn on_transition(&mut self, transition: Transition, now: Instant) {
        let Transition { relay_id: id, status } = transition;
        let Some(relay) = self.table.get(id) else {
            return;
        };
        let persist = relay.boot_mode.persists();
        let restore = relay
            .pulse
            .restore_for(status)
            .filter(|_| relay.pulse_time.as_ticks() > 0);
        let pulse_time = relay.pulse_time;

        if self.pulses.contains(id) {
            self.pulses.poll(id, status, now);
        } else if let Some(restore) = restore {
            self.pulses.trigger(pulse_time, id, restore, now);
        }

        self.notify(id, status);
        for observer in &mut self.change_observers {
            observer(id, status);
        }

        self.persistence.schedule(now, persist);
    }
}
