use serde::Serialize;
use std::fmt;

/// A board pin identifier (a GPIO number).
pub type Pin = u8;

/// One-shot analog input.
///
/// Implementations map a pin number to whatever channel handle the board's
/// HAL requires, and return the raw conversion scaled to 16 bits.
pub trait Adc {
    type Error: fmt::Debug;

    fn read_u16(&mut self, pin: Pin) -> Result<u16, Self::Error>;
}

impl<A: Adc + ?Sized> Adc for &mut A {
    type Error = A::Error;

    fn read_u16(&mut self, pin: Pin) -> Result<u16, Self::Error> {
        (**self).read_u16(pin)
    }
}

/// The set of pins with ADC capability on a particular board.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AdcPins(&'static [Pin]);

impl AdcPins {
    /// Raspberry Pi Pico / Pico W (RP2040): ADC0-ADC2 on GP26-GP28.
    pub const RP2040: Self = Self(&[26, 27, 28]);

    /// Adafruit QT Py ESP32-C3: A0-A3 are GPIO4, GPIO3, GPIO1 and GPIO0 on
    /// ADC1. GPIO2 is also on ADC1, but it drives the NeoPixel.
    pub const QT_PY_C3: Self = Self(&[0, 1, 3, 4]);

    pub const fn new(pins: &'static [Pin]) -> Self {
        Self(pins)
    }

    #[must_use]
    pub fn contains(&self, pin: Pin) -> bool {
        self.0.contains(&pin)
    }

    #[must_use]
    pub fn pins(&self) -> &'static [Pin] {
        self.0
    }
}

impl fmt::Display for AdcPins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0).finish()
    }
}
