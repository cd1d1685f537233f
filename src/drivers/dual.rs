//! Dual-relay co-processor link.
//!
//! Several relays share one UART to a small co-processor.  All of their
//! states travel together in one 4-byte frame:
//!
//! ```text
//!   [0xA0, 0x04, MASK, 0xA1]
//! ```
//!
//! Bit `n` of MASK is the status of the link's `n`-th relay.  When every
//! relay is on, the co-processor expects only bit `size` set instead.
//! Frames from the co-processor (its physical buttons) use the same format
//! and are decoded back into status requests.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};

use super::RelayProvider;
use crate::app::ports::SerialPort;
use crate::relay::RelayId;

pub const FRAME_HEADER: u8 = 0xA0;
pub const FRAME_LENGTH: u8 = 0x04;
pub const FRAME_TRAILER: u8 = 0xA1;

/// Relays per link.  Bit `size` must still fit the mask byte.
pub const DUAL_MAX: usize = 7;

pub type Frame = [u8; 4];

pub fn encode(mask: u8) -> Frame {
    [FRAME_HEADER, FRAME_LENGTH, mask, FRAME_TRAILER]
}

/// Decoded inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualUpdate {
    /// The "all on" bit was set.
    AllOn,
    /// Per-relay statuses, bit `n` for the `n`-th relay.
    Mask(u8),
}

impl DualUpdate {
    pub fn status(self, slot: usize) -> bool {
        match self {
            Self::AllOn => true,
            Self::Mask(mask) => mask & (1 << slot) != 0,
        }
    }
}

/// Validate and decode one frame for a link with `size` relays.
pub fn decode(frame: &[u8], size: usize) -> Option<DualUpdate> {
    let &[header, length, mask, trailer] = frame else {
        return None;
    };
    if header != FRAME_HEADER || length != FRAME_LENGTH || trailer != FRAME_TRAILER {
        return None;
    }
    if size < 8 && mask & (1 << size) != 0 {
        Some(DualUpdate::AllOn)
    } else {
        Some(DualUpdate::Mask(mask))
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    relay_id: RelayId,
    status: bool,
}

/// Shared state of one co-processor link.
pub struct DualLink<S: SerialPort> {
    serial: S,
    slots: heapless::Vec<Slot, DUAL_MAX>,
    dirty: bool,
}

impl<S: SerialPort> DualLink<S> {
    pub fn new(serial: S) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            serial,
            slots: heapless::Vec::new(),
            dirty: false,
        }))
    }

    /// Register `relay_id` on the link and return its provider.
    /// `None` once the link is full.
    pub fn attach(link: &Rc<RefCell<Self>>, relay_id: RelayId) -> Option<DualProvider<S>> {
        let slot = {
            let mut inner = link.borrow_mut();
            let slot = inner.slots.len();
            inner
                .slots
                .push(Slot {
                    relay_id,
                    status: false,
                })
                .ok()?;
            slot
        };
        Some(DualProvider {
            link: Rc::clone(link),
            slot,
        })
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Outbound mask for the current slot statuses.
    pub fn mask(&self) -> u8 {
        let size = self.slots.len();
        if size > 0 && self.slots.iter().all(|s| s.status) {
            return 1 << size;
        }
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status)
            .fold(0, |mask, (index, _)| mask | (1 << index))
    }

    fn set(&mut self, slot: usize, status: bool) {
        if let Some(s) = self.slots.get_mut(slot) {
            s.status = status;
            self.dirty = true;
        }
    }

    /// Send the mask frame if any relay changed since the last send.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let mask = self.mask();
        debug!("dual: sending mask 0b{:08b}", mask);
        self.serial.write(&encode(mask));
        self.serial.flush();
    }

    /// Flush pending changes, then decode every complete inbound frame into
    /// `(relay, status)` requests.
    pub fn poll(&mut self) -> heapless::Vec<(RelayId, bool), DUAL_MAX> {
        self.flush();

        let mut requests = heapless::Vec::new();
        let mut frame: Frame = [0; 4];
        while self.serial.available() >= frame.len() {
            if self.serial.read(&mut frame) < frame.len() {
                break;
            }
            let Some(update) = decode(&frame, self.slots.len()) else {
                warn!("dual: dropping malformed frame {:02X?}", frame);
                continue;
            };
            // Each frame carries the full state; the newest one wins.
            requests.clear();
            for (index, slot) in self.slots.iter().enumerate() {
                let _ = requests.push((slot.relay_id, update.status(index)));
            }
        }
        requests
    }
}

/// One relay on a [`DualLink`].
pub struct DualProvider<S: SerialPort> {
    link: Rc<RefCell<DualLink<S>>>,
    slot: usize,
}

impl<S: SerialPort> RelayProvider for DualProvider<S> {
    fn id(&self) -> &'static str {
        "dual"
    }

    fn change(&mut self, status: bool) {
        // Sent on the next poll so that simultaneous changes share a frame.
        self.link.borrow_mut().set(self.slot, status);
    }
}
