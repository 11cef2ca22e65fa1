use crate::{
    adc::{Adc, Pin},
    bus::{BusTransport, Connect},
    error::{RegistrationError, SourceError},
};
use embedded_hal::blocking::delay::DelayMs;
use serde::Serialize;
use std::{fmt, str::FromStr};

/// Transforms a command payload before it is put on the wire, for sensors
/// whose protocol requires checksummed or obfuscated command bytes.
pub type Transform = fn(&[u8]) -> Vec<u8>;

/// Whether a source runs once during setup or on every scan.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Init,
    Measure,
}

/// A named measurement source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Source {
    /// A 16-bit reading from an ADC-capable pin.
    Analog { pin: Pin },
    /// A command written to an I2C device, optionally followed by a read of
    /// the device's response.
    I2c(I2cCommand),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct I2cCommand {
    address: u8,
    command: Vec<u8>,
    response_len: usize,
}

/// Responses are decoded into a single `u64`.
pub const MAX_RESPONSE_LEN: usize = 8;

// === impl Category ===

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Measure => "measure",
        }
    }
}

impl FromStr for Category {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "measure" => Ok(Self::Measure),
            _ => Err(RegistrationError::InvalidCategory(s.to_owned())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl Source ===

impl Source {
    /// Reads the source's current value.
    ///
    /// Analog sources sample their pin. I2C sources write their command (with
    /// retries and the settle delay), then read and decode the response; a
    /// command with no response yields `0`.
    pub fn invoke<C, D, A>(
        &self,
        bus: &mut BusTransport<C, D>,
        adc: &mut A,
    ) -> Result<u64, SourceError>
    where
        C: Connect,
        D: DelayMs<u32>,
        A: Adc,
    {
        match self {
            Self::Analog { pin } => {
                let value = adc.read_u16(*pin).map_err(|error| SourceError::Adc {
                    pin: *pin,
                    reason: format!("{error:?}"),
                })?;
                Ok(value.into())
            }
            Self::I2c(cmd) => {
                bus.write(cmd.address, &cmd.command)?;
                if cmd.response_len == 0 {
                    return Ok(0);
                }
                let response = bus.read(cmd.address, cmd.response_len)?;
                Ok(decode_be(&response))
            }
        }
    }

    #[must_use]
    pub fn pin(&self) -> Option<Pin> {
        match self {
            Self::Analog { pin } => Some(*pin),
            Self::I2c(_) => None,
        }
    }
}

// === impl I2cCommand ===

impl I2cCommand {
    pub const DEFAULT_RESPONSE_LEN: usize = 3;

    pub fn new(address: u8, command: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            command: command.into(),
            response_len: Self::DEFAULT_RESPONSE_LEN,
        }
    }

    /// Replaces the command bytes with `transform(command)`.
    ///
    /// The transform runs once, here; nothing is sent on the bus until the
    /// source is invoked.
    #[must_use]
    pub fn with_transform(self, transform: Transform) -> Self {
        Self {
            command: transform(&self.command),
            ..self
        }
    }

    #[must_use]
    pub fn with_response_len(self, response_len: usize) -> Self {
        Self {
            response_len,
            ..self
        }
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// The bytes written to the device, after any transform.
    #[must_use]
    pub fn command(&self) -> &[u8] {
        &self.command
    }

    #[must_use]
    pub fn response_len(&self) -> usize {
        self.response_len
    }

    pub(crate) fn validate(&self) -> Result<(), RegistrationError> {
        if self.address > 0x7f {
            return Err(RegistrationError::InvalidAddress(self.address));
        }
        if self.response_len > MAX_RESPONSE_LEN {
            return Err(RegistrationError::ResponseTooLong(self.response_len));
        }
        Ok(())
    }

    pub(crate) fn write_only(self) -> Self {
        Self {
            response_len: 0,
            ..self
        }
    }
}

/// Interprets `bytes` as one big-endian unsigned integer.
#[must_use]
pub fn decode_be(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_categories() {
        assert_eq!("init".parse::<Category>(), Ok(Category::Init));
        assert_eq!("measure".parse::<Category>(), Ok(Category::Measure));
        assert_eq!(
            "Measure".parse::<Category>(),
            Err(RegistrationError::InvalidCategory("Measure".into()))
        );
        assert_eq!(
            "bogus".parse::<Category>(),
            Err(RegistrationError::InvalidCategory("bogus".into()))
        );
    }

    #[test]
    fn decodes_big_endian() {
        assert_eq!(decode_be(&[]), 0);
        assert_eq!(decode_be(&[0x01, 0x02, 0x03]), 0x01_02_03);
        assert_eq!(decode_be(&[0xff; 8]), u64::MAX);
    }

    #[test]
    fn transform_is_applied_once() {
        fn reverse(bytes: &[u8]) -> Vec<u8> {
            bytes.iter().rev().copied().collect()
        }
        let cmd = I2cCommand::new(0x58, [0x20, 0x08]).with_transform(reverse);
        assert_eq!(cmd.command(), &[0x08, 0x20]);
    }

    #[test]
    fn validates_address_and_response_len() {
        assert_eq!(I2cCommand::new(0x7f, [0x00]).validate(), Ok(()));
        assert_eq!(
            I2cCommand::new(0x80, [0x00]).validate(),
            Err(RegistrationError::InvalidAddress(0x80))
        );
        assert_eq!(
            I2cCommand::new(0x58, [0x00]).with_response_len(9).validate(),
            Err(RegistrationError::ResponseTooLong(9))
        );
    }
}
