use crate::adc::Pin;
use thiserror::Error;

/// Errors returned when a measurement source cannot be registered.
///
/// These are reported synchronously by the registration call. A failed
/// registration leaves the registry exactly as it was.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RegistrationError {
    #[error("pin {pin} is already in use")]
    PinConflict { pin: Pin },

    #[error("pin {pin} is not a valid ADC pin on this board")]
    InvalidPin { pin: Pin },

    #[error("invalid command category {0:?}; must be one of: init, measure")]
    InvalidCategory(String),

    #[error("I2C address {0:#04x} is not a 7-bit address")]
    InvalidAddress(u8),

    #[error("cannot decode a {0}-byte response into a single reading")]
    ResponseTooLong(usize),

    /// A measurement command must read something back.
    #[error("measurement commands must read at least one byte")]
    EmptyResponse,
}

/// Errors returned by the two-wire bus transport.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum BusError {
    /// The device did not accept a write, even after retrying.
    #[error("write to {address:#04x} failed after {attempts} attempts: {reason}")]
    Write {
        address: u8,
        attempts: usize,
        reason: String,
    },

    #[error("read from {address:#04x} failed: {reason}")]
    Read { address: u8, reason: String },

    /// The bus handle could not be opened.
    #[error("I2C bus unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned when invoking a single measurement source.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SourceError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("failed to read ADC pin {pin}: {reason}")]
    Adc { pin: Pin, reason: String },
}

/// Errors returned when a node is constructed with an unusable configuration.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("reporting interval must be at least one second")]
    ZeroInterval,

    #[error("SDA and SCL cannot share pin {0}")]
    BusPinsOverlap(Pin),

    #[error("sensor name must not be empty")]
    EmptyName,
}
