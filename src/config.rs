use crate::{adc::AdcPins, adc::Pin, error::ConfigError};
use serde::Serialize;
use std::time::Duration;

/// The two pins used by the I2C bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BusPins {
    pub sda: Pin,
    pub scl: Pin,
}

/// Static configuration for a sensor node.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NodeConfig {
    /// The sensor's identity, reported in every payload.
    pub name: &'static str,
    pub topic: &'static str,
    pub reporting_interval_secs: u32,
    pub bus_pins: BusPins,
    pub adc_pins: AdcPins,
    /// How many times a failed bus write is retried before giving up.
    pub max_retries: usize,
    pub retry_backoff_ms: u32,
    /// How long to wait after a successful write before the device is
    /// expected to have processed the command.
    pub settle_ms: u32,
}

impl NodeConfig {
    pub const DEFAULT_TOPIC: &'static str = "sensor_data";
    pub const DEFAULT_INTERVAL_SECS: u32 = 5;
    pub const DEFAULT_MAX_RETRIES: usize = 5;
    pub const DEFAULT_RETRY_BACKOFF_MS: u32 = 20;
    pub const DEFAULT_SETTLE_MS: u32 = 100;

    /// Returns a configuration for a Pico W style board: SDA on GP0, SCL on
    /// GP1, analog inputs on GP26-GP28.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            topic: Self::DEFAULT_TOPIC,
            reporting_interval_secs: Self::DEFAULT_INTERVAL_SECS,
            bus_pins: BusPins { sda: 0, scl: 1 },
            adc_pins: AdcPins::RP2040,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            retry_backoff_ms: Self::DEFAULT_RETRY_BACKOFF_MS,
            settle_ms: Self::DEFAULT_SETTLE_MS,
        }
    }

    pub const fn with_topic(self, topic: &'static str) -> Self {
        Self { topic, ..self }
    }

    pub const fn with_reporting_interval_secs(self, reporting_interval_secs: u32) -> Self {
        Self {
            reporting_interval_secs,
            ..self
        }
    }

    pub const fn with_bus_pins(self, sda: Pin, scl: Pin) -> Self {
        Self {
            bus_pins: BusPins { sda, scl },
            ..self
        }
    }

    pub const fn with_adc_pins(self, adc_pins: AdcPins) -> Self {
        Self { adc_pins, ..self }
    }

    pub const fn with_retries(self, max_retries: usize, retry_backoff_ms: u32) -> Self {
        Self {
            max_retries,
            retry_backoff_ms,
            ..self
        }
    }

    pub const fn with_settle_ms(self, settle_ms: u32) -> Self {
        Self { settle_ms, ..self }
    }

    #[must_use]
    pub fn reporting_interval(&self) -> Duration {
        Duration::from_secs(self.reporting_interval_secs.into())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.reporting_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.bus_pins.sda == self.bus_pins.scl {
            return Err(ConfigError::BusPinsOverlap(self.bus_pins.sda));
        }
        Ok(())
    }
}
