//! Unified error types for the relay firmware.
//!
//! Relay operations themselves are total (bad ids return `false`, storage
//! failures are logged).  This type covers the places where a caller does
//! need a reason: terminal commands, config loading, and boot.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::duration::ParseDurationError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No relay with that id.
    InvalidRelayId,
    /// Payload text did not map to on/off/toggle.
    InvalidStatus,
    /// Duration text was rejected by the parser.
    InvalidDuration(ParseDurationError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Durable storage failed.
    Storage(StorageError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRelayId => write!(f, "Invalid relayID"),
            Self::InvalidStatus => write!(f, "Invalid status"),
            Self::InvalidDuration(_) => write!(f, "Invalid time"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseDurationError> for Error {
    fn from(e: ParseDurationError) -> Self {
        Self::InvalidDuration(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
