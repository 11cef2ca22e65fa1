//! Board support for the Adafruit QT Py ESP32-C3.
pub mod adc;
pub mod i2c;
pub mod mqtt;
pub mod wifi;
pub mod ws2812;

use crate::{adc::AdcPins, config::NodeConfig};

/// STEMMA QT connector.
pub const SDA: u8 = 5;
pub const SCL: u8 = 6;

/// Returns a node configuration matching the QT Py C3's pinout.
pub const fn config(name: &'static str) -> NodeConfig {
    NodeConfig::new(name)
        .with_bus_pins(SDA, SCL)
        .with_adc_pins(AdcPins::QT_PY_C3)
}
