//! Relay provider backends and hardware initialisation.
//!
//! A provider performs the physical side of a transition.  The relay core
//! calls it through [`RelayProvider`]; nothing in `relay/` or `app/` knows
//! which backend sits behind a relay.
//!
//! | Provider       | Drives                                              |
//! |----------------|-----------------------------------------------------|
//! | `DummyProvider`| nothing (virtual relays)                            |
//! | `gpio`         | one or two digital lines, optionally latched        |
//! | `dual`         | shared UART link, all relays packed in one mask     |
//! | `stm`          | UART link, one frame per relay change               |

pub mod dual;
pub mod gpio;
pub mod hw_init;
pub mod stm;

use embassy_time::Duration;

/// Capability set of a relay backend.
pub trait RelayProvider {
    /// Short backend name shown in diagnostics.
    fn id(&self) -> &'static str;

    /// Prepare the hardware.  A provider that returns `false` is not added.
    fn setup(&mut self) -> bool {
        true
    }

    /// Called once when the relay boots toward `status`.  Returns an extra
    /// settle delay before the first transition may fire.
    fn boot(&mut self, _status: bool) -> Option<Duration> {
        None
    }

    /// Perform the physical change.
    fn change(&mut self, status: bool);

    /// A request for the current status arrived; no change happens.
    fn notify(&mut self, _status: bool) {}
}

/// Provider with no physical effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyProvider;

impl RelayProvider for DummyProvider {
    fn id(&self) -> &'static str {
        "dummy"
    }

    fn change(&mut self, _status: bool) {}
}
