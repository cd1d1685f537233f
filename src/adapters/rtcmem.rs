//! RTC memory adapter.
//!
//! Implements [`FastMemoryPort`] with a word in RTC slow memory that is not
//! cleared on a warm reset.  A magic word marks the copy valid; power-on
//! and brownout resets discard it because RTC memory content is undefined
//! after either.

use log::info;

use crate::app::ports::FastMemoryPort;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const RTC_MAGIC: u32 = 0x5245_4C59;

#[cfg(target_os = "espidf")]
#[repr(C)]
struct RtcBlock {
    magic: u32,
    relay_mask: u32,
}

#[cfg(target_os = "espidf")]
#[unsafe(link_section = ".rtc_noinit")]
static mut RTC_BLOCK: RtcBlock = RtcBlock {
    magic: 0,
    relay_mask: 0,
};

pub struct RtcMemory {
    valid: bool,
    #[cfg(not(target_os = "espidf"))]
    relay_mask: u32,
}

impl RtcMemory {
    /// Inspect the RTC block.  Validity is decided once here, before the
    /// first write re-arms the magic word.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        use esp_idf_svc::sys::*;

        // SAFETY: esp_reset_reason only reads a cached register value.
        let reason = unsafe { esp_reset_reason() };
        let cold = reason == esp_reset_reason_t_ESP_RST_POWERON
            || reason == esp_reset_reason_t_ESP_RST_BROWNOUT;
        // SAFETY: RTC_BLOCK is only touched from the main task.
        let magic = unsafe { core::ptr::read_volatile(&raw const RTC_BLOCK.magic) };
        let valid = !cold && magic == RTC_MAGIC;

        info!("RtcMemory: reset reason {}, valid={}", reason, valid);
        Self { valid }
    }

    /// Simulation: starts invalid, like a power-on.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("RtcMemory: simulation backend");
        Self {
            valid: false,
            relay_mask: 0,
        }
    }

    /// Simulation: a copy that survived a warm reset.
    #[cfg(not(target_os = "espidf"))]
    pub fn warm(relay_mask: u32) -> Self {
        Self {
            valid: true,
            relay_mask,
        }
    }
}

impl Default for RtcMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl FastMemoryPort for RtcMemory {
    fn is_valid(&self) -> bool {
        self.valid
    }

    #[cfg(target_os = "espidf")]
    fn relay_mask(&self) -> u32 {
        // SAFETY: main-task only.
        unsafe { core::ptr::read_volatile(&raw const RTC_BLOCK.relay_mask) }
    }

    #[cfg(not(target_os = "espidf"))]
    fn relay_mask(&self) -> u32 {
        self.relay_mask
    }

    #[cfg(target_os = "espidf")]
    fn set_relay_mask(&mut self, mask: u32) {
        // SAFETY: main-task only.
        unsafe {
            core::ptr::write_volatile(&raw mut RTC_BLOCK.relay_mask, mask);
            core::ptr::write_volatile(&raw mut RTC_BLOCK.magic, RTC_MAGIC);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_relay_mask(&mut self, mask: u32) {
        self.relay_mask = mask;
    }
}
