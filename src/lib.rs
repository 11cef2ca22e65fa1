//! Sensor measurement registry and acquisition engine for a small
//! environmental sensor node.
//!
//! Measurement sources (analog pins and I2C commands) are registered on a
//! [`Node`], validated against the board's pin constraints, and then invoked
//! on a fixed interval. Each scan produces a [`Snapshot`], which is
//! serialized to JSON and handed to a [`Publisher`].
pub mod adc;
pub mod bus;
pub mod config;
pub mod error;
pub mod hash;
pub mod indicator;
pub mod logger;
pub mod node;
pub mod publish;
pub mod registry;
pub mod retry;
pub mod snapshot;
pub mod source;
pub mod status;

#[cfg(feature = "esp")]
pub mod esp;

pub use self::{
    adc::{Adc, AdcPins, Pin},
    bus::{BusTransport, Connect},
    config::{BusPins, NodeConfig},
    error::{BusError, ConfigError, RegistrationError, SourceError},
    indicator::{Indicator, NoIndicator, PinIndicator},
    node::{Node, Shutdown},
    publish::{LogPublisher, Publisher},
    registry::Registry,
    retry::Retry,
    snapshot::{Reading, Snapshot},
    source::{Category, I2cCommand, Source, Transform},
    status::{NodeStatus, Status},
};
