//! Stm co-processor provider: one frame per relay change.
//!
//! ```text
//!   [0xA0, index + 1, status, 0xA1 + status + index]
//! ```
//!
//! The co-processor drops frames for a few seconds after power-up, so
//! each relay's first transition is held back by `3 s + 1 s * index`.

use embassy_time::Duration;

use super::RelayProvider;
use crate::app::ports::SerialPort;

const FRAME_HEADER: u8 = 0xA0;
const CHECKSUM_BASE: u8 = 0xA1;

pub fn encode(index: u8, status: bool) -> [u8; 4] {
    let status = u8::from(status);
    [
        FRAME_HEADER,
        index.wrapping_add(1),
        status,
        CHECKSUM_BASE.wrapping_add(status).wrapping_add(index),
    ]
}

pub struct StmProvider<S: SerialPort> {
    serial: S,
    index: u8,
}

impl<S: SerialPort> StmProvider<S> {
    pub fn new(serial: S, index: u8) -> Self {
        Self { serial, index }
    }
}

impl<S: SerialPort> RelayProvider for StmProvider<S> {
    fn id(&self) -> &'static str {
        "stm"
    }

    fn boot(&mut self, _status: bool) -> Option<Duration> {
        Some(Duration::from_millis(3000 + 1000 * u64::from(self.index)))
    }

    fn change(&mut self, status: bool) {
        self.serial.flush();
        self.serial.write(&encode(self.index, status));
        self.serial.flush();
    }
}
