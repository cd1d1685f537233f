//! Port traits: the hexagonal boundary between relay logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RelayService (domain)
//! ```
//!
//! Driven adapters (clock, storage, fast memory, serial links) implement
//! these traits.  The [`RelayService`](super::service::RelayService) and the
//! provider backends consume them, so the domain core never touches
//! hardware directly.
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed.

use std::cell::RefCell;
use std::rc::Rc;

use embassy_time::Instant;

use crate::config::SystemConfig;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source for delays, flood windows, and pulse timers.
pub trait Clock {
    fn now(&self) -> Instant;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid values are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Durable key-value storage.
///
/// Keys are namespaced to prevent collisions between subsystems.  Write
/// operations MUST be atomic: no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Fast memory port (driven adapter: domain ↔ RTC memory)
// ───────────────────────────────────────────────────────────────

/// Battery-backed memory that survives a warm reset but not a power loss.
pub trait FastMemoryPort {
    /// Contents survived the last reset and can be trusted.
    fn is_valid(&self) -> bool;

    /// Last stored relay status mask.
    fn relay_mask(&self) -> u32;

    fn set_relay_mask(&mut self, mask: u32);
}

// ───────────────────────────────────────────────────────────────
// Serial port (driven adapter: providers ↔ co-processor UART)
// ───────────────────────────────────────────────────────────────

/// Byte link to a relay co-processor.
pub trait SerialPort {
    fn write(&mut self, bytes: &[u8]);

    /// Block until queued bytes are on the wire.
    fn flush(&mut self);

    /// Read up to `buf.len()` buffered bytes.  Returns the count read.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Bytes waiting to be read.
    fn available(&self) -> usize;
}

/// Several providers may share one UART.
impl<S: SerialPort> SerialPort for Rc<RefCell<S>> {
    fn write(&mut self, bytes: &[u8]) {
        self.borrow_mut().write(bytes);
    }

    fn flush(&mut self) {
        self.borrow_mut().flush();
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.borrow_mut().read(buf)
    }

    fn available(&self) -> usize {
        self.borrow().available()
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
