//! GPIO / peripheral pin assignments for the relay board.
//!
//! Single source of truth for the default configuration and the UART link
//! to relay co-processors.  Per-relay pins can be overridden in NVS.

// ---------------------------------------------------------------------------
// Relay outputs
// ---------------------------------------------------------------------------

/// Default output of relay 0.
pub const RELAY1_GPIO: u8 = 12;
/// Suggested outputs for additional relays.
pub const RELAY2_GPIO: u8 = 5;
pub const RELAY3_GPIO: u8 = 4;
pub const RELAY4_GPIO: u8 = 15;

// ---------------------------------------------------------------------------
// Co-processor UART (dual / stm providers)
// ---------------------------------------------------------------------------

pub const RELAY_UART_PORT: i32 = 1;
pub const RELAY_UART_TX_GPIO: i32 = 17;
pub const RELAY_UART_RX_GPIO: i32 = 18;
pub const RELAY_UART_BAUDRATE: u32 = 19_200;
