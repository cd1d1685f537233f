//! Direct GPIO relay provider.
//!
//! ```text
//!   Normal          pin = status
//!   Inverse         pin = !status
//!   Latched         short HIGH pulse on `set` (on) or `reset` (off)
//!   LatchedInverse  short LOW pulse on `set` (on) or `reset` (off)
//! ```
//!
//! A latched relay without a reset line is pulsed on the set line for both
//! directions (toggling bistable coil).  The pulse holds the control loop
//! for `latch_pulse`; a bistable coil needs only tens of milliseconds, and
//! the single-threaded loop has nothing else to do while the coil moves.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use log::warn;
use serde::{Deserialize, Serialize};

use super::RelayProvider;

/// Default latching pulse width.
pub const LATCH_PULSE_MS: u32 = 10;

/// How the relay coil is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GpioKind {
    #[default]
    Normal,
    Inverse,
    Latched,
    LatchedInverse,
}

impl GpioKind {
    pub fn is_latched(self) -> bool {
        matches!(self, Self::Latched | Self::LatchedInverse)
    }
}

pub struct GpioProvider<P: OutputPin, D: DelayNs> {
    kind: GpioKind,
    pin: P,
    reset_pin: Option<P>,
    delay: D,
    latch_pulse_ms: u32,
}

impl<P: OutputPin, D: DelayNs> GpioProvider<P, D> {
    pub fn new(kind: GpioKind, pin: P, reset_pin: Option<P>, delay: D) -> Self {
        Self {
            kind,
            pin,
            reset_pin,
            delay,
            latch_pulse_ms: LATCH_PULSE_MS,
        }
    }

    pub fn with_latch_pulse(mut self, ms: u32) -> Self {
        self.latch_pulse_ms = ms;
        self
    }

    fn write(pin: &mut P, high: bool) {
        if let Err(e) = pin.set_state(PinState::from(high)) {
            warn!("gpio: write failed: {:?}", e);
        }
    }

    fn write_both(&mut self, high: bool) {
        Self::write(&mut self.pin, high);
        if let Some(reset) = self.reset_pin.as_mut() {
            Self::write(reset, high);
        }
    }

    fn latch(&mut self, status: bool) {
        let pulse = self.kind == GpioKind::Latched;

        self.write_both(!pulse);
        match self.reset_pin.as_mut() {
            Some(reset) if !status => Self::write(reset, pulse),
            _ => Self::write(&mut self.pin, pulse),
        }

        self.delay.delay_ms(self.latch_pulse_ms);

        self.write_both(!pulse);
    }
}

impl<P: OutputPin, D: DelayNs> RelayProvider for GpioProvider<P, D> {
    fn id(&self) -> &'static str {
        "gpio"
    }

    fn setup(&mut self) -> bool {
        match self.kind {
            GpioKind::Normal => Self::write(&mut self.pin, false),
            GpioKind::Inverse => Self::write(&mut self.pin, true),
            GpioKind::Latched => self.write_both(false),
            GpioKind::LatchedInverse => self.write_both(true),
        }
        true
    }

    fn change(&mut self, status: bool) {
        match self.kind {
            GpioKind::Normal => Self::write(&mut self.pin, status),
            GpioKind::Inverse => Self::write(&mut self.pin, !status),
            GpioKind::Latched | GpioKind::LatchedInverse => self.latch(status),
        }
    }
}
