//! Application core. Relay logic only, no I/O.
//!
//! The relay table, its coordination rules, and the transport-facing API.
//! All interaction with hardware and storage happens through **port
//! traits** defined in [`ports`] and the provider trait in
//! [`drivers`](crate::drivers), keeping this layer testable without real
//! peripherals.

pub mod commands;
pub mod ports;
pub mod service;
pub mod terminal;
