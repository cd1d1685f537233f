//! Cross-relay coordination: sync modes, interlock ordering, group locks.

use relaynode::config::SystemConfig;
use relaynode::relay::{BootMode, RelayLock, ReportFlags, SyncMode};

use crate::mock_hw::{Rig, config_with};

fn synced(mode: SyncMode, interlock_ms: u32, relays: usize) -> SystemConfig {
    let mut cfg = config_with(relays, |_| {});
    cfg.sync_mode = mode;
    cfg.interlock_delay_ms = interlock_ms;
    cfg
}

// ── One / NoneOrOne ───────────────────────────────────────────

#[test]
fn one_mode_switches_off_before_switching_on() {
    let mut rig = Rig::new(synced(SyncMode::One, 0, 3), 3);

    rig.service.set_status(0, true);
    assert!(rig.service.is_sync_locked());
    rig.tick();
    assert_eq!(rig.statuses(), vec![true, false, false]);
    assert!(!rig.service.is_sync_locked());

    rig.service.set_status(2, true);
    rig.tick();
    assert_eq!(rig.statuses(), vec![false, false, true]);
    assert_eq!(rig.changes(), vec![(0, true), (0, false), (2, true)]);
}

#[test]
fn one_mode_hands_over_to_next_relay() {
    let mut rig = Rig::new(synced(SyncMode::One, 0, 3), 3);
    rig.service.set_status(0, true);
    rig.tick();

    rig.service.set_status(0, false);
    rig.tick();
    assert_eq!(rig.statuses(), vec![false, true, false]);

    // The last relay wraps around to the first.
    rig.service.set_status(2, true);
    rig.tick();
    rig.service.set_status(2, false);
    rig.tick();
    assert_eq!(rig.statuses(), vec![true, false, false]);
}

#[test]
fn interlock_delays_the_on_side_and_locks_the_group() {
    let mut rig = Rig::new(synced(SyncMode::One, 500, 2), 2);
    rig.service.set_status(0, true);
    rig.tick();
    rig.changes.borrow_mut().clear();

    rig.clock.set(1_000);
    assert!(rig.service.set_status(1, true));
    assert_eq!(rig.service.state_report().lock.as_slice(), &[1, 2]);

    // Locked against the pending decision.
    assert!(!rig.service.set_status(0, true));
    assert_eq!(rig.service.take_report(0), Some(ReportFlags::BOTH));

    rig.tick_at(1_000);
    assert_eq!(rig.changes(), vec![(0, false)]);
    rig.tick_at(1_500);
    assert_eq!(rig.statuses(), vec![false, false]);
    assert!(rig.service.is_sync_locked());

    rig.tick_at(1_501);
    assert_eq!(rig.changes(), vec![(0, false), (1, true)]);
    assert!(!rig.service.is_sync_locked());
    assert_eq!(rig.service.state_report().lock.as_slice(), &[0, 0]);
}

#[test]
fn none_or_one_defers_unlock_when_all_off() {
    let mut rig = Rig::new(synced(SyncMode::NoneOrOne, 500, 2), 2);
    rig.service.set_status(0, true);
    rig.tick();
    assert!(!rig.service.is_sync_locked());

    rig.clock.set(1_000);
    rig.service.set_status(0, false);
    rig.tick();
    assert_eq!(rig.statuses(), vec![false, false]);
    assert!(rig.service.is_sync_locked());

    rig.clock.set(1_200);
    assert!(!rig.service.set_status(1, true));

    rig.tick_at(1_499);
    assert!(rig.service.is_sync_locked());
    rig.tick_at(1_500);
    assert!(!rig.service.is_sync_locked());
    assert!(rig.service.set_status(1, true));
}

#[test]
fn none_or_one_without_interlock_unlocks_at_once() {
    let mut rig = Rig::new(synced(SyncMode::NoneOrOne, 0, 2), 2);
    rig.service.set_status(1, true);
    rig.tick();
    rig.service.set_status(1, false);
    rig.tick();
    assert!(!rig.service.is_sync_locked());
}

#[test]
fn unlock_restores_boot_locks() {
    let mut cfg = synced(SyncMode::One, 0, 3);
    cfg.relays[2].boot_mode = BootMode::LockedOff;
    let mut rig = Rig::new(cfg, 3);

    rig.service.set_status(0, true);
    rig.tick();
    assert!(!rig.service.is_sync_locked());
    assert_eq!(rig.service.relay(2).unwrap().lock(), RelayLock::Off);
    assert_eq!(rig.service.relay(1).unwrap().lock(), RelayLock::None);
    assert!(!rig.service.set_status(2, true));
}

// ── Same / First / Any ────────────────────────────────────────

#[test]
fn same_mode_mirrors_every_relay() {
    let mut rig = Rig::new(synced(SyncMode::Same, 0, 3), 3);
    rig.service.set_status(1, true);
    rig.tick();
    assert_eq!(rig.statuses(), vec![true, true, true]);

    rig.service.set_status(0, false);
    rig.tick();
    assert_eq!(rig.statuses(), vec![false, false, false]);
    assert!(!rig.service.is_sync_locked());
}

#[test]
fn first_mode_only_follows_relay_zero() {
    let mut rig = Rig::new(synced(SyncMode::First, 0, 3), 3);
    rig.service.set_status(0, true);
    rig.tick();
    assert_eq!(rig.statuses(), vec![true, true, true]);

    rig.service.set_status(2, false);
    rig.tick();
    assert_eq!(rig.statuses(), vec![true, true, false]);
}

#[test]
fn any_mode_leaves_relays_independent() {
    let mut rig = Rig::new(synced(SyncMode::Any, 500, 2), 2);
    rig.service.set_status(0, true);
    rig.service.set_status(1, true);
    rig.tick();
    assert_eq!(rig.statuses(), vec![true, true]);
    assert!(!rig.service.is_sync_locked());
}

#[test]
fn single_relay_is_never_coordinated() {
    let mut rig = Rig::new(synced(SyncMode::One, 500, 1), 1);
    rig.service.set_status(0, true);
    assert!(!rig.service.is_sync_locked());
    rig.tick();
    assert!(rig.service.status(0));
}
