//! Concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to                  |
//! |------------|-------------------|------------------------------|
//! | `hardware` | `OutputPin`       | ESP32 GPIO                   |
//! | `log_sink` | status observer   | Serial log output            |
//! | `nvs`      | ConfigPort        | NVS / in-memory store        |
//! |            | StoragePort       |                              |
//! | `rtcmem`   | FastMemoryPort    | RTC slow memory              |
//! | `time`     | Clock, `DelayNs`  | ESP32 system timer           |
//! | `uart`     | SerialPort        | UART to relay co-processors  |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod rtcmem;
pub mod time;
pub mod uart;
