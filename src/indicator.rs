use embedded_hal::digital::v2::OutputPin;
use std::fmt;

/// A binary status indicator (an LED, typically), lit while the node is
/// publishing.
pub trait Indicator {
    fn set(&mut self, on: bool) -> anyhow::Result<()>;
}

/// An indicator driven by a GPIO output.
#[derive(Debug)]
pub struct PinIndicator<P> {
    pin: P,
    active_low: bool,
}

/// For boards without an indicator.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIndicator;

impl<P> PinIndicator<P>
where
    P: OutputPin,
    P::Error: fmt::Debug,
{
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// For LEDs wired between the pin and VCC.
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> Indicator for PinIndicator<P>
where
    P: OutputPin,
    P::Error: fmt::Debug,
{
    fn set(&mut self, on: bool) -> anyhow::Result<()> {
        let result = if on != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|error| anyhow::anyhow!("failed to set indicator pin: {error:?}"))
    }
}

impl Indicator for NoIndicator {
    fn set(&mut self, _: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<I: Indicator + ?Sized> Indicator for &mut I {
    fn set(&mut self, on: bool) -> anyhow::Result<()> {
        (**self).set(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Default)]
    struct Led(Vec<bool>);

    impl OutputPin for Led {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.push(true);
            Ok(())
        }
    }

    #[test]
    fn active_high() {
        let mut led = PinIndicator::new(Led::default());
        led.set(true).unwrap();
        led.set(false).unwrap();
        assert_eq!(led.into_inner().0, vec![true, false]);
    }

    #[test]
    fn active_low() {
        let mut led = PinIndicator::active_low(Led::default());
        led.set(true).unwrap();
        led.set(false).unwrap();
        assert_eq!(led.into_inner().0, vec![false, true]);
    }
}
