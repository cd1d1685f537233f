//! RelayNode firmware library.
//!
//! Exposes the relay control core for integration testing and for the
//! firmware binary. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod duration;
pub mod error;
pub mod persistence;
pub mod pins;
pub mod relay;
pub mod scheduler;

// Hardware-facing modules; the ESP-IDF implementations are guarded by cfg
// attributes inside and fall back to simulation stubs on the host.
pub mod adapters;
pub mod drivers;
