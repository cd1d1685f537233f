//! Transition scheduler.
//!
//! Advances pending relay transitions once per control-loop iteration.
//!
//! ```text
//!   tick(now)
//!     ├── pass 1: every pending relay whose target is OFF
//!     └── pass 2: every pending relay whose target is ON
//! ```
//!
//! Running all "off" transitions before any "on" transition means an
//! interlocked pair never has both outputs energised, even when both
//! changes become due in the same tick.
//!
//! The scheduler owns the only write to `current_status`.  What happens
//! after a transition fires (observers, pulse timers, persistence) is the
//! service's business; it gets the list of [`Transition`]s back.

use embassy_time::Instant;
use log::info;

use crate::relay::{RelayId, RelayTable, RELAYS_MAX};

/// A transition that fired during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub relay_id: RelayId,
    pub status: bool,
}

pub type Transitions = heapless::Vec<Transition, RELAYS_MAX>;

/// Fire every due transition toward `status`.
fn pass(table: &mut RelayTable, status: bool, now: Instant, fired: &mut Transitions) {
    for (id, relay) in table.iter_mut().enumerate() {
        if !relay.is_pending() || relay.target_status != status || !relay.is_due(now) {
            continue;
        }

        relay.change_delay = embassy_time::Duration::from_ticks(0);
        relay.current_status = status;
        relay.provider.change(status);

        info!("relay{}: {}", id, if status { "ON" } else { "OFF" });
        // At most one transition per relay per pass.
        let _ = fired.push(Transition {
            relay_id: id,
            status,
        });
    }
}

/// Run both passes.  Returns the fired transitions in firing order.
pub fn run(table: &mut RelayTable, now: Instant) -> Transitions {
    let mut fired = Transitions::new();
    pass(table, false, now, &mut fired);
    pass(table, true, now, &mut fired);
    fired
}
