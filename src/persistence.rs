//! Relay status persistence.
//!
//! The boot mask (one bit per relay) is kept in two places:
//!
//! | Copy     | Port             | Survives         | Encoding        |
//! |----------|------------------|------------------|-----------------|
//! | fast     | `FastMemoryPort` | warm reset       | raw `u32` word  |
//! | durable  | `StoragePort`    | power loss       | decimal string  |
//!
//! Boot prefers the fast copy when it is marked valid.  Writes are
//! debounced: a burst of transitions produces one write once the relays
//! have been quiet for `save_delay`.

use core::fmt::{self, Write as _};
use core::str::FromStr;

use embassy_time::{Duration, Instant};
use log::{info, warn};

use crate::app::ports::{FastMemoryPort, StoragePort};
use crate::relay::{RelayId, RelayTable, RELAYS_MAX};

pub const SETTINGS_NAMESPACE: &str = "relay";
pub const BOOT_MASK_KEY: &str = "bootMask";

/// Snapshot of relay statuses, bit `n` for relay `n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootMask(u32);

impl BootMask {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn get(self, id: RelayId) -> bool {
        id < RELAYS_MAX && self.0 & (1 << id) != 0
    }

    pub fn set(&mut self, id: RelayId, status: bool) {
        if id >= RELAYS_MAX {
            return;
        }
        if status {
            self.0 |= 1 << id;
        } else {
            self.0 &= !(1 << id);
        }
    }

    /// Current statuses of every relay in `table`.
    pub fn from_table(table: &RelayTable) -> Self {
        let mut mask = Self::default();
        for (id, relay) in table.iter().enumerate() {
            mask.set(id, relay.current_status());
        }
        mask
    }
}

impl fmt::Display for BootMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BootMask {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Where the boot mask came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSource {
    FastMemory,
    Durable,
    /// Neither copy was usable; every bit reads off.
    Empty,
}

#[derive(Debug, Clone, Copy)]
struct PendingSave {
    due: Instant,
    persist: bool,
}

pub struct Persistence {
    fast: Box<dyn FastMemoryPort>,
    store: Box<dyn StoragePort>,
    save_delay: Duration,
    pending: Option<PendingSave>,
}

impl Persistence {
    pub fn new(
        fast: Box<dyn FastMemoryPort>,
        store: Box<dyn StoragePort>,
        save_delay: Duration,
    ) -> Self {
        Self {
            fast,
            store,
            save_delay,
            pending: None,
        }
    }

    /// Read the mask used to resolve boot policies.
    pub fn read_boot_mask(&self) -> (BootMask, MaskSource) {
        if self.fast.is_valid() {
            return (BootMask::from_bits(self.fast.relay_mask()), MaskSource::FastMemory);
        }

        let mut buf = [0u8; 12];
        let stored = self
            .store
            .read(SETTINGS_NAMESPACE, BOOT_MASK_KEY, &mut buf)
            .ok()
            .and_then(|len| core::str::from_utf8(&buf[..len]).ok())
            .map(str::parse::<BootMask>);

        match stored {
            Some(Ok(mask)) => (mask, MaskSource::Durable),
            Some(Err(_)) => {
                warn!("Persistence: durable boot mask unreadable, using 0");
                (BootMask::default(), MaskSource::Empty)
            }
            None => (BootMask::default(), MaskSource::Empty),
        }
    }

    /// Schedule a debounced save.  Every call pushes the deadline out by
    /// `save_delay`; persist requests accumulate until the save runs.
    pub fn schedule(&mut self, now: Instant, persist: bool) {
        let persist = persist || self.pending.is_some_and(|p| p.persist);
        self.pending = Some(PendingSave {
            due: now + self.save_delay,
            persist,
        });
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The persist flag of a save that is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<bool> {
        match self.pending {
            Some(p) if now >= p.due => {
                self.pending = None;
                Some(p.persist)
            }
            _ => None,
        }
    }

    /// Write `mask` to fast memory, and to durable storage when `persist`.
    pub fn write(&mut self, mask: BootMask, persist: bool) {
        self.fast.set_relay_mask(mask.bits());

        if persist {
            let mut text: heapless::String<12> = heapless::String::new();
            let _ = write!(text, "{}", mask);
            if let Err(e) = self
                .store
                .write(SETTINGS_NAMESPACE, BOOT_MASK_KEY, text.as_bytes())
            {
                warn!("Persistence: boot mask write failed: {}", e);
                return;
            }
        }

        info!(
            "Persistence: saved mask {:#b}{}",
            mask.bits(),
            if persist { " (durable)" } else { "" }
        );
    }
}
