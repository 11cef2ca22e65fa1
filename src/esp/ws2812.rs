use crate::indicator::Indicator;
use anyhow::Context;
use esp_idf_hal::{
    gpio,
    peripheral::Peripheral,
    rmt::{config::TransmitConfig, FixedLengthSignal, PinState, Pulse, RmtChannel, TxRmtDriver},
};
use std::time::Duration;

/// A single WS2812 ("NeoPixel") LED, driven over RMT, used as the node's
/// publish indicator.
pub struct NeoPixel<'driver> {
    tx: TxRmtDriver<'driver>,
    one: (Pulse, Pulse),
    zero: (Pulse, Pulse),
    on_color: Rgb,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Self = Self(0, 0, 0);
    pub const RED: Self = Self(255, 0, 0);
    pub const BLUE: Self = Self(0, 0, 64);
}

const SIGNAL_LEN: usize = 24;

impl<'driver> NeoPixel<'driver> {
    pub fn new(
        pin: impl Peripheral<P = impl gpio::OutputPin + 'static> + 'static,
        channel: impl Peripheral<P = impl RmtChannel> + 'driver,
    ) -> anyhow::Result<Self> {
        let config = TransmitConfig::new().clock_divider(1);
        let tx = TxRmtDriver::new(channel, pin, &config)
            .context("failed to initialize NeoPixel TX RMT driver")?;

        let ticks_hz = tx
            .counter_clock()
            .context("failed to get TX RMT driver counter clock")?;

        let pulse_nanos = |pin_state: PinState, nanos: u64| {
            Pulse::new_with_duration(ticks_hz, pin_state, &Duration::from_nanos(nanos))
                .with_context(|| {
                    format!("failed to construct pulse ({pin_state:?} for {nanos} ns)")
                })
        };
        let zero = (
            pulse_nanos(PinState::High, 350)?,
            pulse_nanos(PinState::Low, 800)?,
        );
        let one = (
            pulse_nanos(PinState::High, 700)?,
            pulse_nanos(PinState::Low, 600)?,
        );

        Ok(Self {
            tx,
            zero,
            one,
            on_color: Rgb::BLUE,
        })
    }

    /// The color shown while the indicator is on.
    pub fn with_on_color(self, on_color: Rgb) -> Self {
        Self { on_color, ..self }
    }

    pub fn set_color(&mut self, Rgb(r, g, b): Rgb) -> anyhow::Result<&mut Self> {
        // WS2812s clock in green first.
        let grb = u32::from_be_bytes([0, g, r, b]);
        let mut signal = FixedLengthSignal::<SIGNAL_LEN>::new();
        for i in 0..SIGNAL_LEN {
            let bit = grb & (1 << (SIGNAL_LEN - 1 - i)) != 0;
            let pulses = if bit { self.one } else { self.zero };
            signal
                .set(i, &pulses)
                .context("failed to set signal bit")?;
        }

        self.tx
            .start_blocking(&signal)
            .context("failed to send blocking RMT signal")?;
        Ok(self)
    }
}

impl Indicator for NeoPixel<'_> {
    fn set(&mut self, on: bool) -> anyhow::Result<()> {
        let color = if on { self.on_color } else { Rgb::OFF };
        self.set_color(color)?;
        Ok(())
    }
}
