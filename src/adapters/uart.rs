//! UART adapter for relay co-processors.
//!
//! Implements [`SerialPort`] on the UART installed by
//! [`init_relay_uart`](crate::drivers::hw_init::init_relay_uart).  The
//! simulation backend is a pair of byte queues.

use crate::app::ports::SerialPort;

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Ticks to wait for the TX FIFO to drain on flush.
#[cfg(target_os = "espidf")]
const FLUSH_TIMEOUT_TICKS: u32 = 100;

pub struct UartPort {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    port: i32,
    #[cfg(not(target_os = "espidf"))]
    rx: VecDeque<u8>,
    #[cfg(not(target_os = "espidf"))]
    tx: Vec<u8>,
}

impl UartPort {
    pub fn new(port: i32) -> Self {
        Self {
            port,
            #[cfg(not(target_os = "espidf"))]
            rx: VecDeque::new(),
            #[cfg(not(target_os = "espidf"))]
            tx: Vec::new(),
        }
    }

    /// Simulation: queue bytes as if the co-processor sent them.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Simulation: everything written so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn written(&self) -> &[u8] {
        &self.tx
    }
}

impl SerialPort for UartPort {
    #[cfg(target_os = "espidf")]
    fn write(&mut self, bytes: &[u8]) {
        // SAFETY: the driver was installed by init_relay_uart(); bytes is a
        // valid buffer for its whole length.
        let written =
            unsafe { uart_write_bytes(self.port, bytes.as_ptr() as *const _, bytes.len()) };
        if written < 0 || written as usize != bytes.len() {
            log::warn!("uart{}: short write {}/{}", self.port, written, bytes.len());
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }

    #[cfg(target_os = "espidf")]
    fn flush(&mut self) {
        // SAFETY: driver installed; blocks at most FLUSH_TIMEOUT_TICKS.
        unsafe {
            uart_wait_tx_done(self.port, FLUSH_TIMEOUT_TICKS);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn flush(&mut self) {}

    #[cfg(target_os = "espidf")]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        // SAFETY: driver installed; zero timeout never blocks.
        let n = unsafe { uart_read_bytes(self.port, buf.as_mut_ptr() as *mut _, buf.len() as u32, 0) };
        n.max(0) as usize
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        n
    }

    #[cfg(target_os = "espidf")]
    fn available(&self) -> usize {
        let mut len: usize = 0;
        // SAFETY: driver installed; writes a single usize.
        if unsafe { uart_get_buffered_data_len(self.port, &mut len) } != ESP_OK {
            return 0;
        }
        len
    }

    #[cfg(not(target_os = "espidf"))]
    fn available(&self) -> usize {
        self.rx.len()
    }
}
