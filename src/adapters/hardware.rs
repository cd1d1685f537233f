//! Hardware adapter: relay output lines as `embedded-hal` pins.
//!
//! [`GpioProvider`](crate::drivers::gpio::GpioProvider) is generic over
//! [`OutputPin`]; this is the pin it gets on the board.  On non-espidf
//! targets the write goes to the simulation stub in `hw_init`.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::drivers::hw_init::gpio_write;

/// One GPIO configured by
/// [`init_relay_outputs`](crate::drivers::hw_init::init_relay_outputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPin {
    gpio: u8,
}

impl RelayPin {
    pub fn new(gpio: u8) -> Self {
        Self { gpio }
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }
}

impl ErrorType for RelayPin {
    type Error = Infallible;
}

impl OutputPin for RelayPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.gpio, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.gpio, true);
        Ok(())
    }
}
