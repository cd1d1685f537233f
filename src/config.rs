//! System configuration parameters
//!
//! All tunable parameters of the relay subsystem.  Loaded from NVS through
//! [`ConfigPort`](crate::app::ports::ConfigPort); defaults apply on first boot.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::drivers::gpio::{GpioKind, LATCH_PULSE_MS};
use crate::pins;
use crate::relay::{BootMode, PulseMode, RELAYS_MAX, SyncMode};

/// Longest configurable pulse, in milliseconds.
pub const PULSE_MAX_MS: u32 = 0x68D_7A3;
/// Shortest configurable pulse, in milliseconds.
pub const PULSE_MIN_MS: u32 = 5;

pub type Payload = heapless::String<16>;

/// Which backend drives a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    None,
    #[default]
    Dummy,
    Gpio,
    Dual,
    Stm,
}

/// Per-relay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub provider: ProviderKind,
    pub gpio_kind: GpioKind,
    /// Output GPIO (set line for latched relays).
    pub pin: Option<u8>,
    /// Reset line of a latched relay.
    pub reset_pin: Option<u8>,

    pub boot_mode: BootMode,
    pub pulse: PulseMode,
    pub pulse_time_ms: u32,

    pub delay_on_ms: u32,
    pub delay_off_ms: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Dummy,
            gpio_kind: GpioKind::Normal,
            pin: None,
            reset_pin: None,
            boot_mode: BootMode::Off,
            pulse: PulseMode::None,
            pulse_time_ms: 1000,
            delay_on_ms: 0,
            delay_off_ms: 0,
        }
    }
}

impl RelayConfig {
    /// Plain GPIO relay on `pin`.
    pub fn gpio(pin: u8) -> Self {
        Self {
            provider: ProviderKind::Gpio,
            pin: Some(pin),
            ..Self::default()
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Relays ---
    pub relays: heapless::Vec<RelayConfig, RELAYS_MAX>,
    /// Virtual relays appended after the configured ones.
    pub dummy_count: u8,

    // --- Coordination ---
    pub sync_mode: SyncMode,
    /// Minimum gap between chained transitions (ms).
    pub interlock_delay_ms: u32,

    // --- Flood protection ---
    pub flood_window_ms: u32,
    pub flood_changes: u8,

    // --- Timing ---
    /// Debounce before the status mask is written out (ms).
    pub save_delay_ms: u32,
    /// Coil pulse width of latched relays (ms).
    pub latching_pulse_ms: u32,

    // --- Payloads ---
    pub payload_on: Payload,
    pub payload_off: Payload,
    pub payload_toggle: Payload,
}

fn payload(text: &str) -> Payload {
    let mut p = Payload::new();
    let _ = p.push_str(text);
    p
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut relays = heapless::Vec::new();
        let _ = relays.push(RelayConfig::gpio(pins::RELAY1_GPIO));

        Self {
            relays,
            dummy_count: 0,

            sync_mode: SyncMode::Any,
            interlock_delay_ms: 0,

            flood_window_ms: 3000,
            flood_changes: 5,

            save_delay_ms: 1000,
            latching_pulse_ms: LATCH_PULSE_MS,

            payload_on: payload("on"),
            payload_off: payload("off"),
            payload_toggle: payload("toggle"),
        }
    }
}

impl SystemConfig {
    /// Settings of relay `id`; relays beyond the configured list (dummies,
    /// late additions) get the defaults.
    pub fn relay(&self, id: usize) -> RelayConfig {
        self.relays.get(id).cloned().unwrap_or_default()
    }

    /// Configured plus dummy relays.
    pub fn relay_count(&self) -> usize {
        self.relays.len() + usize::from(self.dummy_count)
    }
}

/// Range-check every field.  Invalid values are rejected, never clamped.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if cfg.relay_count() > RELAYS_MAX {
        return Err(ConfigError::ValidationFailed(
            "relays + dummy_count must be at most 32",
        ));
    }
    if cfg.flood_changes == 0 {
        return Err(ConfigError::ValidationFailed("flood_changes must be >= 1"));
    }
    if cfg.flood_window_ms == 0 {
        return Err(ConfigError::ValidationFailed("flood_window_ms must be > 0"));
    }
    if cfg.latching_pulse_ms == 0 || cfg.latching_pulse_ms > 1000 {
        return Err(ConfigError::ValidationFailed(
            "latching_pulse_ms must be 1–1000",
        ));
    }
    for relay in &cfg.relays {
        if relay.provider == ProviderKind::Gpio {
            let Some(pin) = relay.pin else {
                return Err(ConfigError::ValidationFailed("gpio relay needs a pin"));
            };
            if relay.gpio_kind.is_latched() && relay.reset_pin == Some(pin) {
                return Err(ConfigError::ValidationFailed(
                    "reset_pin must differ from pin",
                ));
            }
        }
        if relay.pulse != PulseMode::None
            && !(PULSE_MIN_MS..=PULSE_MAX_MS).contains(&relay.pulse_time_ms)
        {
            return Err(ConfigError::ValidationFailed(
                "pulse_time_ms must be 5–6870947",
            ));
        }
    }
    Ok(())
}
