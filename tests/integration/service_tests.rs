//! RelayService request handling: scheduling, cancellation, flood
//! protection, pulses, reports, and observers.

use std::cell::RefCell;
use std::rc::Rc;

use embassy_time::Duration;

use relaynode::app::commands::PayloadStatus;
use relaynode::config::ProviderKind;
use relaynode::relay::pulse::PulseRegistry;
use relaynode::relay::{BootMode, PulseMode, ReportFlags};

use crate::mock_hw::{MemFast, MemStore, RecordingProvider, Rig, config_with};

fn plain(count: usize) -> Rig {
    Rig::new(config_with(count, |_| {}), count)
}

// ── Scheduling ────────────────────────────────────────────────

#[test]
fn request_fires_on_next_tick() {
    let mut rig = plain(1);
    assert!(rig.service.set_status(0, true));
    assert!(!rig.service.status(0));
    assert!(rig.service.target_status(0));

    rig.tick();
    assert!(rig.service.status(0));
    assert_eq!(rig.changes(), vec![(0, true)]);
}

#[test]
fn repeated_request_is_idempotent() {
    let mut rig = plain(1);
    assert!(!rig.service.set_status(0, false));

    assert!(rig.service.set_status(0, true));
    assert!(!rig.service.set_status(0, true));
    rig.tick();
    assert!(!rig.service.set_status(0, true));
    rig.tick_at(10_000);

    assert_eq!(rig.changes(), vec![(0, true)]);
}

#[test]
fn on_delay_must_strictly_elapse() {
    let mut rig = Rig::new(config_with(1, |r| r.delay_on_ms = 500), 1);
    rig.service.set_status(0, true);

    rig.tick_at(500);
    assert!(!rig.service.status(0));
    rig.tick_at(501);
    assert!(rig.service.status(0));
}

#[test]
fn reverting_cancels_pending_change() {
    let mut rig = Rig::new(config_with(1, |r| r.delay_on_ms = 500), 1);
    assert!(rig.service.set_status(0, true));
    rig.tick_at(200);
    assert!(rig.service.set_status(0, false));

    rig.tick_at(1_000);
    assert!(rig.changes().is_empty());
    assert!(!rig.service.target_status(0));
    assert_eq!(rig.service.take_report(0), None);
}

#[test]
fn unknown_relay_is_rejected_everywhere() {
    let mut rig = plain(2);
    assert!(!rig.service.set_status(2, true));
    assert!(!rig.service.toggle(7));
    assert!(!rig.service.pulse(9, Duration::from_millis(100), None));
    assert!(!rig.service.status(2));
    assert!(rig.service.relay(2).is_none());
    assert_eq!(rig.service.take_report(2), None);
}

#[test]
fn toggle_uses_physical_status() {
    let mut rig = plain(1);
    assert!(rig.service.toggle(0));
    rig.tick();
    assert!(rig.service.status(0));
    assert!(rig.service.toggle(0));
    rig.tick();
    assert_eq!(rig.changes(), vec![(0, true), (0, false)]);
}

#[test]
fn payloads_map_to_requests() {
    let mut rig = plain(1);
    assert_eq!(rig.service.parse_payload("on"), PayloadStatus::On);
    assert!(rig.service.apply_payload(0, PayloadStatus::On));
    rig.tick();
    assert!(rig.service.apply_payload(0, PayloadStatus::Toggle));
    assert!(!rig.service.apply_payload(0, PayloadStatus::Unknown));
    rig.tick();
    assert!(!rig.service.status(0));
    assert_eq!(rig.service.payload_for(true), "on");
}

// ── Flood protection ──────────────────────────────────────────

#[test]
fn fifth_flip_in_window_is_postponed_not_dropped() {
    let mut rig = plain(1);
    for (i, t) in [0u64, 100, 200, 300].into_iter().enumerate() {
        rig.clock.set(t);
        assert!(rig.service.toggle(0));
        rig.tick();
        assert_eq!(rig.changes().len(), i + 1);
    }

    rig.clock.set(400);
    assert!(rig.service.toggle(0));
    assert_eq!(
        rig.service.relay(0).unwrap().change_delay(),
        Duration::from_millis(2_600)
    );

    rig.tick_at(3_000);
    assert_eq!(rig.changes().len(), 4);
    rig.tick_at(3_001);
    assert_eq!(rig.changes().len(), 5);
    assert!(rig.service.status(0));
}

#[test]
fn quiet_window_resets_flood_count() {
    let mut rig = plain(1);
    for t in [0u64, 100, 200, 300] {
        rig.clock.set(t);
        rig.service.toggle(0);
        rig.tick();
    }

    // More than one window later the count starts over.
    for t in [3_400u64, 3_500, 3_600, 3_700] {
        rig.clock.set(t);
        rig.service.toggle(0);
        rig.tick();
    }
    assert_eq!(rig.changes().len(), 8);
}

// ── Pulses ────────────────────────────────────────────────────

#[test]
fn pulse_reverts_exactly_once() {
    let mut rig = plain(1);
    assert!(rig.service.pulse(0, Duration::from_millis(2_000), None));
    assert_eq!(rig.service.pending_pulses(), 1);

    rig.tick_at(0);
    rig.tick_at(1_999);
    assert_eq!(rig.changes(), vec![(0, true)]);

    rig.tick_at(2_000);
    assert_eq!(rig.changes(), vec![(0, true), (0, false)]);
    assert_eq!(rig.service.pending_pulses(), 0);

    rig.tick_at(10_000);
    assert_eq!(rig.changes().len(), 2);
}

#[test]
fn pulse_clock_restarts_when_relay_flips() {
    let mut rig = Rig::new(config_with(1, |r| r.delay_on_ms = 1_000), 1);
    rig.service.pulse(0, Duration::from_millis(1_500), None);

    rig.tick_at(1_001);
    assert!(rig.service.status(0));
    rig.tick_at(2_500);
    assert!(rig.service.status(0));
    rig.tick_at(2_501);
    assert!(!rig.service.status(0));
}

#[test]
fn pulse_with_explicit_initial_status() {
    let mut rig = plain(1);
    rig.service.set_status(0, true);
    rig.tick();

    assert!(rig.service.pulse(0, Duration::from_millis(100), Some(false)));
    rig.tick_at(0);
    assert!(!rig.service.status(0));
    rig.tick_at(100);
    assert!(rig.service.status(0));
}

#[test]
fn zero_length_pulse_is_ignored() {
    let mut rig = plain(1);
    assert!(!rig.service.pulse(0, Duration::from_ticks(0), None));
    assert_eq!(rig.service.pending_pulses(), 0);
    assert!(!rig.service.target_status(0));
}

#[test]
fn configured_pulse_restores_after_on() {
    let cfg = config_with(1, |r| {
        r.pulse = PulseMode::Off;
        r.pulse_time_ms = 1_000;
    });
    let mut rig = Rig::new(cfg, 1);

    rig.service.set_status(0, true);
    rig.tick_at(0);
    assert_eq!(rig.service.pending_pulses(), 1);

    rig.tick_at(999);
    assert!(rig.service.status(0));
    rig.tick_at(1_000);
    assert!(!rig.service.status(0));

    // Off is the resting state of an Off-pulse relay.
    rig.tick_at(5_000);
    assert_eq!(rig.service.pending_pulses(), 0);
}

#[test]
fn long_pulse_spans_several_timer_arms() {
    let mut rig = Rig::unbooted(config_with(1, |_| {}), MemStore::default(), MemFast::default())
        .map_service(|s| {
            s.with_pulse_registry(PulseRegistry::with_max_interval(Duration::from_millis(1_000)))
        });
    rig.add_recorders(1);
    rig.service.boot();
    rig.tick();
    rig.changes.borrow_mut().clear();

    rig.service.pulse(0, Duration::from_millis(3_500), None);
    rig.tick_at(0);
    rig.tick_at(3_000);
    assert!(rig.service.status(0));
    assert_eq!(rig.service.pending_pulses(), 1);
    rig.tick_at(3_500);
    assert_eq!(rig.changes(), vec![(0, true), (0, false)]);
}

// ── Reports ───────────────────────────────────────────────────

#[test]
fn report_flags_are_handed_out_once() {
    let mut rig = plain(1);
    rig.service.set_status_with(0, true, true, false);
    assert_eq!(
        rig.service.take_report(0),
        Some(ReportFlags {
            report: true,
            group_report: false
        })
    );
    assert_eq!(rig.service.take_report(0), None);

    rig.tick();
    rig.service.toggle(0);
    assert_eq!(
        rig.service.take_report(0),
        Some(ReportFlags {
            report: false,
            group_report: true
        })
    );
}

#[test]
fn state_report_serialises_as_arrays() {
    let mut rig = plain(2);
    rig.service.set_status(1, true);
    rig.tick();

    let json = serde_json::to_string(&rig.service.state_report()).unwrap();
    assert_eq!(json, r#"{"size":2,"status":[0,1],"lock":[0,0]}"#);
}

// ── Observers ─────────────────────────────────────────────────

#[test]
fn notify_sees_requests_change_sees_flips() {
    let mut rig = plain(1);
    let notified = Rc::new(RefCell::new(Vec::new()));
    let changed = Rc::new(RefCell::new(Vec::new()));
    {
        let notified = Rc::clone(&notified);
        rig.service
            .on_status_notify(move |id, status| notified.borrow_mut().push((id, status)));
        let changed = Rc::clone(&changed);
        rig.service
            .on_status_change(move |id, status| changed.borrow_mut().push((id, status)));
    }

    rig.service.set_status(0, false);
    rig.service.set_status(0, true);
    rig.tick();

    assert_eq!(*notified.borrow(), vec![(0, false), (0, true), (0, true)]);
    assert_eq!(*changed.borrow(), vec![(0, true)]);
}

// ── Late relays ───────────────────────────────────────────────

#[test]
fn relay_added_after_boot_boots_immediately() {
    let mut rig = Rig::new(config_with(2, |r| r.boot_mode = BootMode::On), 1);
    rig.add_recorders(1);
    assert!(rig.service.target_status(1));
    rig.tick();
    assert_eq!(rig.changes(), vec![(1, true)]);
}

#[test]
fn skipped_config_entry_does_not_shift_settings() {
    let mut cfg = config_with(2, |_| {});
    cfg.relays[0].provider = ProviderKind::None;
    cfg.relays[1].boot_mode = BootMode::On;
    cfg.relays[1].delay_on_ms = 500;

    let mut rig = Rig::unbooted(cfg.clone(), MemStore::default(), MemFast::default());
    let provider = RecordingProvider::new(0, &rig.changes);
    assert_eq!(
        rig.service.add_relay_with(Box::new(provider), &cfg.relays[1]),
        Some(0)
    );
    rig.service.boot();

    assert!(rig.service.target_status(0));
    assert_eq!(rig.service.relay(0).unwrap().delay_on(), Duration::from_millis(500));
    rig.tick_at(500);
    assert!(!rig.service.status(0));
    rig.tick_at(501);
    assert_eq!(rig.changes(), vec![(0, true)]);
}
