use crate::{bus::Connect, config::BusPins};
use esp_idf_hal::{
    gpio::{Gpio5, Gpio6},
    i2c::{I2cConfig, I2cDriver, I2cError, I2C0},
    peripheral::Peripheral,
    prelude::*,
};

/// Builds the I2C0 driver on first use.
///
/// The peripherals are only given up once a driver has been built, so a
/// failed open can be attempted again.
pub struct I2c0Connector {
    parts: Option<(I2C0, Gpio5, Gpio6)>,
}

impl I2c0Connector {
    pub fn new(i2c: I2C0, sda: Gpio5, scl: Gpio6) -> Self {
        Self {
            parts: Some((i2c, sda, scl)),
        }
    }
}

impl Connect for I2c0Connector {
    type Error = I2cError;
    type Bus = I2cDriver<'static>;

    fn connect(&mut self, pins: BusPins) -> anyhow::Result<Self::Bus> {
        anyhow::ensure!(
            pins == BusPins {
                sda: super::SDA,
                scl: super::SCL
            },
            "I2C0 is wired to SDA {} / SCL {}, not {pins:?}",
            super::SDA,
            super::SCL,
        );
        let (i2c, sda, scl) = self
            .parts
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("I2C0 peripheral already taken"))?;

        // Sensirion parts want 100 kHz or less, and the master has to support
        // clock stretching.
        let config = I2cConfig::new().baudrate(100u32.kHz().into());
        // SAFETY: the originals are dropped as soon as a driver owns the
        // clones, so at most one driver ever holds I2C0 and its pins.
        let driver = unsafe {
            I2cDriver::new(
                i2c.clone_unchecked(),
                sda.clone_unchecked(),
                scl.clone_unchecked(),
                &config,
            )
        }?;
        self.parts = None;
        Ok(driver)
    }
}
