use crate::{
    adc::{Adc, Pin},
    bus::{BusTransport, Connect},
    config::NodeConfig,
    error::{ConfigError, RegistrationError},
    indicator::Indicator,
    publish::Publisher,
    registry::Registry,
    snapshot::{Reading, Snapshot},
    source::{Category, I2cCommand, Transform},
    status::{NodeStatus, Status},
};
use anyhow::Context;
use embedded_hal::blocking::delay::DelayMs;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A sensor node: the measurement registry plus the hardware it needs to
/// invoke its sources.
///
/// The node runs a strictly sequential loop (scan, publish, sleep) on the
/// thread that calls [`Node::run`]. It owns the bus transport outright, so
/// there is never more than one bus transaction in flight.
pub struct Node<C: Connect, A, L, D> {
    config: NodeConfig,
    registry: Registry,
    bus: BusTransport<C, D>,
    adc: A,
    indicator: L,
    indicator_on: bool,
    status: NodeStatus,
}

/// Asks a running node to stop after its current cycle.
#[derive(Clone, Debug, Default)]
pub struct Shutdown(Arc<AtomicBool>);

const TARGET: &str = "envnode::node";

/// Sleeps between scans are split into chunks of at most this long, so that
/// a shutdown request is noticed promptly.
const SLEEP_CHUNK_MS: u32 = 1000;

impl<C, A, L, D> Node<C, A, L, D>
where
    C: Connect,
    A: Adc,
    L: Indicator,
    D: DelayMs<u32>,
{
    pub fn new(
        config: NodeConfig,
        connector: C,
        adc: A,
        indicator: L,
        delay: D,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let pins = config.bus_pins;
        let registry = Registry::new(config.adc_pins, [pins.sda, pins.scl]);
        let bus = BusTransport::new(connector, pins, delay)
            .with_retry(config.max_retries, config.retry_backoff_ms)
            .with_settle_ms(config.settle_ms);
        log::info!(
            target: TARGET,
            "{}: reporting to {:?} every {}s; ADC pins {}",
            config.name,
            config.topic,
            config.reporting_interval_secs,
            config.adc_pins,
        );

        Ok(Self {
            config,
            registry,
            bus,
            adc,
            indicator,
            indicator_on: false,
            status: NodeStatus::Initializing,
        })
    }

    pub fn register_analog(
        &mut self,
        name: impl Into<String>,
        pin: Pin,
    ) -> Result<(), RegistrationError> {
        self.registry.register_analog(name, pin)
    }

    pub fn register_i2c(
        &mut self,
        name: impl Into<String>,
        address: u8,
        command: &[u8],
        category: &str,
        transform: Option<Transform>,
    ) -> Result<(), RegistrationError> {
        self.registry
            .register_i2c(name, address, command, category, transform)
    }

    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        category: Category,
        command: I2cCommand,
    ) -> Result<(), RegistrationError> {
        self.registry.register_command(name, category, command)
    }

    /// Logs the devices present on the bus and runs every `init` source
    /// once, in registration order.
    ///
    /// A failing init source is logged and skipped; the node keeps going with
    /// whatever did initialize.
    pub fn setup(&mut self) {
        if self.registry.uses_bus() {
            match self.bus.scan() {
                Ok(found) => log::info!(target: TARGET, "I2C devices: {found:02x?}"),
                Err(error) => log::warn!(target: TARGET, "I2C scan failed: {error}"),
            }
        }

        let Self {
            registry, bus, adc, ..
        } = self;
        for entry in registry.entries_mut(Category::Init) {
            match entry.source().invoke(bus, adc) {
                Ok(_) => {
                    entry.record(true);
                    log::info!(target: TARGET, "initialized {}", entry.name());
                }
                Err(error) => {
                    entry.record(false);
                    log::warn!(target: TARGET, "failed to initialize {}: {error}", entry.name());
                }
            }
        }

        self.status = NodeStatus::Idle;
    }

    /// Invokes every `measure` source, in registration order.
    ///
    /// A source that fails is recorded as [`Reading::Failed`]; the rest of
    /// the scan continues.
    pub fn run_once(&mut self) -> Snapshot {
        self.status = NodeStatus::Scanning;
        let mut snapshot = Snapshot::new(self.config.name);

        let Self {
            registry, bus, adc, ..
        } = self;
        for entry in registry.entries_mut(Category::Measure) {
            let reading = match entry.source().invoke(bus, adc) {
                Ok(value) => {
                    if entry.record(true) != Status::Up {
                        log::info!(target: TARGET, "{} is up", entry.name());
                    }
                    Reading::Value(value)
                }
                Err(error) => {
                    log::warn!(target: TARGET, "error reading {}: {error}", entry.name());
                    entry.record(false);
                    Reading::Failed(error.to_string())
                }
            };
            snapshot.push(entry.name(), reading);
        }

        log::info!(target: TARGET, "{snapshot}");
        snapshot
    }

    /// Serializes `snapshot` and hands it to `publisher`, with the indicator
    /// lit for the duration of the publish.
    pub fn publish<P>(&mut self, publisher: &mut P, snapshot: &Snapshot) -> anyhow::Result<()>
    where
        P: Publisher + ?Sized,
    {
        let payload = snapshot
            .to_json()
            .context("failed to serialize readings")?;

        self.status = NodeStatus::Publishing;
        self.set_indicator(true);
        let published = publisher.publish(self.config.name, self.config.topic, &payload);
        // one more try before leaving the indicator lit
        if !self.set_indicator(false) {
            self.set_indicator(false);
        }

        published.with_context(|| format!("failed to publish to {:?}", self.config.topic))
    }

    /// Runs setup, then scans and publishes every reporting interval until
    /// `shutdown` is triggered.
    ///
    /// Publish failures are logged; the next cycle runs regardless.
    pub fn run<P: Publisher>(&mut self, mut publisher: P, shutdown: &Shutdown) {
        self.setup();

        while !shutdown.is_triggered() {
            let snapshot = self.run_once();
            if let Err(error) = self.publish(&mut publisher, &snapshot) {
                log::warn!(target: TARGET, "{error:#}");
            }

            if shutdown.is_triggered() {
                break;
            }
            self.sleep(shutdown);
        }

        self.status = NodeStatus::Stopped;
        log::info!(target: TARGET, "{} stopped", self.config.name);
    }

    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn bus(&self) -> &BusTransport<C, D> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut BusTransport<C, D> {
        &mut self.bus
    }

    #[must_use]
    pub fn status(&self) -> NodeStatus {
        self.status
    }

    #[must_use]
    pub fn indicator_is_on(&self) -> bool {
        self.indicator_on
    }

    fn set_indicator(&mut self, on: bool) -> bool {
        match self.indicator.set(on) {
            Ok(()) => {
                self.indicator_on = on;
                true
            }
            Err(error) => {
                log::warn!(target: TARGET, "failed to set indicator: {error:#}");
                false
            }
        }
    }

    fn sleep(&mut self, shutdown: &Shutdown) {
        self.status = NodeStatus::Sleeping;
        let mut remaining_ms = self.config.reporting_interval_secs.saturating_mul(1000);
        log::debug!(target: TARGET, "sleeping for {remaining_ms} ms");

        while remaining_ms > 0 && !shutdown.is_triggered() {
            let chunk = remaining_ms.min(SLEEP_CHUNK_MS);
            self.bus.delay().delay_ms(chunk);
            remaining_ms -= chunk;
        }
    }
}

// === impl Shutdown ===

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
