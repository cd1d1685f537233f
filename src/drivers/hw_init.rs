//! One-shot hardware peripheral initialization.
//!
//! Configures relay output GPIOs and the co-processor UART using raw
//! ESP-IDF sys calls. Called once from `main()` before the control loop
//! starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::UartInitFailed(rc) => write!(f, "UART init failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── GPIO Outputs ──────────────────────────────────────────────

/// Configure every relay line as a push-pull output, driven low.
///
/// The providers set the idle level of each line in their own `setup`.
#[cfg(target_os = "espidf")]
pub fn init_relay_outputs(outputs: &[u8]) -> Result<(), HwInitError> {
    for &pin in outputs {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: called once from main() before the control loop;
        // single-threaded.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(i32::from(pin), 0) };
    }

    info!("hw_init: {} relay outputs configured", outputs.len());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_relay_outputs(outputs: &[u8]) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): {} relay outputs skipped", outputs.len());
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: u8, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was configured in init_relay_outputs(). Main-loop only.
    unsafe {
        gpio_set_level(i32::from(pin), u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: u8, _high: bool) {}

// ── Co-processor UART ─────────────────────────────────────────

/// Receive ring buffer size; frames are 4 bytes, so this holds a burst.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const UART_RX_BUFFER: i32 = 256;

/// Install the UART driver used by the dual and stm providers.
#[cfg(target_os = "espidf")]
pub fn init_relay_uart() -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: pins::RELAY_UART_BAUDRATE as i32,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };

    // SAFETY: called once from main() before the control loop; the driver
    // is owned by UartPort afterwards.
    unsafe {
        let ret = uart_driver_install(
            pins::RELAY_UART_PORT,
            UART_RX_BUFFER,
            0,
            0,
            core::ptr::null_mut(),
            0,
        );
        if ret != ESP_OK {
            return Err(HwInitError::UartInitFailed(ret));
        }

        let ret = uart_param_config(pins::RELAY_UART_PORT, &cfg);
        if ret != ESP_OK {
            return Err(HwInitError::UartInitFailed(ret));
        }

        let ret = uart_set_pin(
            pins::RELAY_UART_PORT,
            pins::RELAY_UART_TX_GPIO,
            pins::RELAY_UART_RX_GPIO,
            UART_PIN_NO_CHANGE,
            UART_PIN_NO_CHANGE,
        );
        if ret != ESP_OK {
            return Err(HwInitError::UartInitFailed(ret));
        }
    }

    info!(
        "hw_init: relay UART{} at {} baud",
        pins::RELAY_UART_PORT,
        pins::RELAY_UART_BAUDRATE
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_relay_uart() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): relay UART skipped");
    Ok(())
}
