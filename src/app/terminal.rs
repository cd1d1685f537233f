//! Terminal commands.
//!
//! ```text
//!   RELAY                      list every relay
//!   RELAY <id>                 show one relay
//!   RELAY <id> <status>        apply on / off / toggle, then show it
//!   PULSE <id> <time> [status] pulse for a duration ("1.5", "1m30s", ...)
//! ```
//!
//! Output goes to any [`core::fmt::Write`]; every command ends with `+OK`
//! or `-ERROR: <reason>`.

use core::fmt::{self, Write};

use crate::duration;
use crate::error::{Error, Result};
use crate::relay::{PulseMode, RelayId, RelayLock};

use super::commands::PayloadStatus;
use super::ports::Clock;
use super::service::RelayService;

fn on_off(status: bool) -> &'static str {
    if status { "ON" } else { "OFF" }
}

/// Run one command line.  Unknown commands return `Ok(false)`.
pub fn execute<C: Clock>(
    service: &mut RelayService<C>,
    line: &str,
    out: &mut impl Write,
) -> core::result::Result<bool, fmt::Error> {
    let mut args = line.split_whitespace();
    let Some(command) = args.next() else {
        return Ok(false);
    };
    let args: heapless::Vec<&str, 4> = args.take(4).collect();

    let result = if command.eq_ignore_ascii_case("RELAY") {
        relay_command(service, &args, out)
    } else if command.eq_ignore_ascii_case("PULSE") {
        pulse_command(service, &args)
    } else {
        return Ok(false);
    };

    match result {
        Ok(()) => writeln!(out, "+OK")?,
        Err(e) => writeln!(out, "-ERROR: {}", e)?,
    }
    Ok(true)
}

fn parse_id<C: Clock>(service: &RelayService<C>, text: &str) -> Result<RelayId> {
    text.parse::<RelayId>()
        .ok()
        .filter(|&id| id < service.count())
        .ok_or(Error::InvalidRelayId)
}

fn relay_command<C: Clock>(
    service: &mut RelayService<C>,
    args: &[&str],
    out: &mut impl Write,
) -> Result<()> {
    let Some(&id_text) = args.first() else {
        for id in 0..service.count() {
            let _ = relay_info(service, id, true, out);
        }
        return Ok(());
    };

    let id = parse_id(service, id_text)?;
    if let Some(&status_text) = args.get(1) {
        let payload = service.parse_payload(status_text);
        if payload == PayloadStatus::Unknown {
            return Err(Error::InvalidStatus);
        }
        service.apply_payload(id, payload);
    }

    let _ = relay_info(service, id, false, out);
    Ok(())
}

fn pulse_command<C: Clock>(service: &mut RelayService<C>, args: &[&str]) -> Result<()> {
    let id = parse_id(service, args.first().copied().unwrap_or_default())?;
    let time = duration::parse(args.get(1).copied().unwrap_or_default())?;

    let initial = match args.get(2) {
        None => None,
        Some(&text) => match service.parse_payload(text) {
            PayloadStatus::On => Some(true),
            PayloadStatus::Off => Some(false),
            PayloadStatus::Toggle => Some(!service.status(id)),
            PayloadStatus::Unknown => return Err(Error::InvalidStatus),
        },
    };

    service.pulse(id, time, initial);
    Ok(())
}

/// Write one relay's description line:
/// `relay0 {Prov=gpio Current=ON Target=ON Pulse=off Time=1000 DelayOn=500 Lock=on}`
///
/// Delays and the lock are only shown when `full` is set.  Unknown ids write
/// nothing.
pub fn relay_info<C: Clock>(
    service: &RelayService<C>,
    id: RelayId,
    full: bool,
    out: &mut impl Write,
) -> fmt::Result {
    let Some(relay) = service.relay(id) else {
        return Ok(());
    };

    write!(
        out,
        "relay{} {{Prov={} Current={} Target={}",
        id,
        relay.provider_id(),
        on_off(relay.current_status()),
        on_off(relay.target_status())
    )?;

    if relay.pulse_mode() != PulseMode::None && relay.pulse_time().as_ticks() > 0 {
        write!(
            out,
            " Pulse={} Time={}",
            relay.pulse_mode().as_str(),
            relay.pulse_time().as_millis()
        )?;
    }

    if full {
        if relay.delay_on().as_ticks() > 0 {
            write!(out, " DelayOn={}", relay.delay_on().as_millis())?;
        }
        if relay.delay_off().as_ticks() > 0 {
            write!(out, " DelayOff={}", relay.delay_off().as_millis())?;
        }
        if relay.lock() != RelayLock::None {
            write!(out, " Lock={}", relay.lock().as_str())?;
        }
    }

    writeln!(out, "}}")
}
