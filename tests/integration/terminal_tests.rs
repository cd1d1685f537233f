//! Terminal commands against a live service.

use relaynode::app::terminal;
use relaynode::relay::{BootMode, PulseMode};

use crate::mock_hw::{Rig, config_with};

fn run(rig: &mut Rig, line: &str) -> String {
    let mut out = String::new();
    assert!(terminal::execute(&mut rig.service, line, &mut out).unwrap());
    out
}

#[test]
fn relay_lists_every_relay() {
    let mut rig = Rig::new(config_with(2, |r| r.delay_on_ms = 500), 2);
    assert_eq!(
        run(&mut rig, "RELAY"),
        "relay0 {Prov=test Current=OFF Target=OFF DelayOn=500}\n\
         relay1 {Prov=test Current=OFF Target=OFF DelayOn=500}\n\
         +OK\n"
    );
}

#[test]
fn relay_with_status_applies_it() {
    let mut rig = Rig::new(config_with(1, |_| {}), 1);
    assert_eq!(
        run(&mut rig, "relay 0 on"),
        "relay0 {Prov=test Current=OFF Target=ON}\n+OK\n"
    );
    rig.tick();
    assert_eq!(
        run(&mut rig, "RELAY 0 toggle"),
        "relay0 {Prov=test Current=ON Target=OFF}\n+OK\n"
    );
}

#[test]
fn relay_shows_pulse_settings() {
    let mut rig = Rig::new(
        config_with(1, |r| {
            r.pulse = PulseMode::Off;
            r.pulse_time_ms = 2_500;
        }),
        1,
    );
    assert_eq!(
        run(&mut rig, "RELAY 0"),
        "relay0 {Prov=test Current=OFF Target=OFF Pulse=off Time=2500}\n+OK\n"
    );
}

#[test]
fn relay_errors() {
    let mut rig = Rig::new(config_with(1, |_| {}), 1);
    assert_eq!(run(&mut rig, "RELAY 3 on"), "-ERROR: Invalid relayID\n");
    assert_eq!(run(&mut rig, "RELAY x"), "-ERROR: Invalid relayID\n");
    assert_eq!(run(&mut rig, "RELAY 0 maybe"), "-ERROR: Invalid status\n");
    assert!(!rig.service.target_status(0));
}

#[test]
fn pulse_command() {
    let mut rig = Rig::new(config_with(1, |_| {}), 1);
    assert_eq!(run(&mut rig, "PULSE 0 1m30s"), "+OK\n");
    assert!(rig.service.target_status(0));
    assert_eq!(rig.service.pending_pulses(), 1);

    rig.tick_at(0);
    rig.tick_at(90_000);
    assert!(!rig.service.status(0));
}

#[test]
fn pulse_with_initial_status() {
    let mut rig = Rig::new(config_with(1, |_| {}), 1);
    assert_eq!(run(&mut rig, "PULSE 0 0.5 off"), "+OK\n");
    // Already off: the timer turns it on after the pulse.
    rig.tick_at(500);
    assert!(rig.service.status(0));
}

#[test]
fn pulse_errors() {
    let mut rig = Rig::new(config_with(1, |_| {}), 1);
    assert_eq!(run(&mut rig, "PULSE"), "-ERROR: Invalid relayID\n");
    assert_eq!(run(&mut rig, "PULSE 0"), "-ERROR: Invalid time\n");
    assert_eq!(run(&mut rig, "PULSE 0 1h30"), "-ERROR: Invalid time\n");
    assert_eq!(run(&mut rig, "PULSE 0 1e15"), "-ERROR: Invalid time\n");
    assert_eq!(run(&mut rig, "PULSE 0 5 sideways"), "-ERROR: Invalid status\n");
    assert_eq!(rig.service.pending_pulses(), 0);
}

#[test]
fn unknown_commands_are_not_handled() {
    let mut rig = Rig::new(config_with(1, |_| {}), 1);
    let mut out = String::new();
    assert!(!terminal::execute(&mut rig.service, "REBOOT", &mut out).unwrap());
    assert!(!terminal::execute(&mut rig.service, "   ", &mut out).unwrap());
    assert!(out.is_empty());
}

#[test]
fn relay_info_shows_delays_and_lock_only_in_full() {
    let cfg = config_with(1, |r| {
        r.boot_mode = BootMode::LockedOn;
        r.delay_off_ms = 250;
    });
    let rig = Rig::new(cfg, 1);

    let mut full = String::new();
    terminal::relay_info(&rig.service, 0, true, &mut full).unwrap();
    assert_eq!(full, "relay0 {Prov=test Current=ON Target=ON DelayOff=250 Lock=on}\n");

    let mut short = String::new();
    terminal::relay_info(&rig.service, 0, false, &mut short).unwrap();
    assert_eq!(short, "relay0 {Prov=test Current=ON Target=ON}\n");

    let mut none = String::new();
    terminal::relay_info(&rig.service, 7, true, &mut none).unwrap();
    assert!(none.is_empty());
}
