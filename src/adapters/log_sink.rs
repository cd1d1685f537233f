//! Log-based status observer.
//!
//! Writes one line per relay flip to the ESP-IDF logger (which goes to
//! UART / USB-CDC in production).  An MQTT or WebSocket publisher would
//! register the same way through
//! [`RelayService::on_status_change`](crate::app::service::RelayService::on_status_change).

use log::info;

use crate::relay::RelayId;

/// Observer that logs every physical status change.
#[derive(Debug, Default)]
pub struct LogStatusSink {
    changes: u32,
}

impl LogStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> u32 {
        self.changes
    }

    pub fn record(&mut self, id: RelayId, status: bool) {
        self.changes = self.changes.wrapping_add(1);
        info!(
            "RELAY | relay{} -> {} | changes={}",
            id,
            if status { "ON" } else { "OFF" },
            self.changes
        );
    }

    /// Move into a callback for the service.
    pub fn into_observer(mut self) -> impl FnMut(RelayId, bool) + 'static {
        move |id, status| self.record(id, status)
    }
}
