//! Retrying byte-level transport over a shared two-wire (I2C) bus.
use crate::{
    config::BusPins,
    error::BusError,
    retry::{Retry, RetryError},
};
use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{self, Read as _, Write as _},
};
use std::{fmt, ops::RangeInclusive};

/// Opens the node's I2C bus.
///
/// This is called at most once per successful open: the resulting handle is
/// kept by the [`BusTransport`] and shared by every I2C source.
pub trait Connect {
    type Error: fmt::Debug;
    type Bus: i2c::Write<Error = Self::Error> + i2c::Read<Error = Self::Error>;

    fn connect(&mut self, pins: BusPins) -> anyhow::Result<Self::Bus>;
}

pub struct BusTransport<C: Connect, D> {
    connector: C,
    pins: BusPins,
    bus: Option<C::Bus>,
    delay: D,
    retry: Retry<C::Error>,
    settle_ms: u32,
}

const TARGET: &str = "envnode::bus";

/// Addresses probed by [`BusTransport::scan`]. 0x00-0x07 and 0x78-0x7F are
/// reserved by the I2C specification.
const SCAN_RANGE: RangeInclusive<u8> = 0x08..=0x77;

impl<C, D> BusTransport<C, D>
where
    C: Connect,
    D: DelayMs<u32>,
{
    pub fn new(connector: C, pins: BusPins, delay: D) -> Self {
        Self {
            connector,
            pins,
            bus: None,
            delay,
            retry: Retry::new(0).with_target(TARGET),
            settle_ms: 0,
        }
    }

    pub fn with_retry(self, max_retries: usize, backoff_ms: u32) -> Self {
        Self {
            retry: Retry::new(max_retries)
                .with_backoff_ms(backoff_ms)
                .with_target(TARGET),
            ..self
        }
    }

    pub fn with_settle_ms(self, settle_ms: u32) -> Self {
        Self { settle_ms, ..self }
    }

    #[must_use]
    pub fn pins(&self) -> BusPins {
        self.pins
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.bus.is_some()
    }

    /// The delay used for backoff and settling. The node sleeps through the
    /// same handle between scans.
    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Returns the bus handle, opening it first if this is the first use.
    pub fn ensure_bus(&mut self) -> Result<&mut C::Bus, BusError> {
        Self::open(&mut self.connector, self.pins, &mut self.bus)
    }

    /// Writes `payload` to the device at `address`, retrying failed
    /// transmissions, then waits for the device to settle.
    pub fn write(&mut self, address: u8, payload: &[u8]) -> Result<(), BusError> {
        let bus = Self::open(&mut self.connector, self.pins, &mut self.bus)?;
        self.retry
            .run(&mut self.delay, || bus.write(address, payload))
            .map_err(|RetryError { error, attempts }| BusError::Write {
                address,
                attempts,
                reason: format!("{error:?}"),
            })?;
        log::debug!(target: TARGET, "wrote {payload:02x?} to {address:#04x}");

        if self.settle_ms > 0 {
            self.delay.delay_ms(self.settle_ms);
        }
        Ok(())
    }

    /// Reads exactly `num_bytes` from the device at `address`. Not retried.
    pub fn read(&mut self, address: u8, num_bytes: usize) -> Result<Vec<u8>, BusError> {
        let bus = Self::open(&mut self.connector, self.pins, &mut self.bus)?;
        let mut buf = vec![0; num_bytes];
        bus.read(address, &mut buf)
            .map_err(|error| BusError::Read {
                address,
                reason: format!("{error:?}"),
            })?;
        log::debug!(target: TARGET, "read {buf:02x?} from {address:#04x}");
        Ok(buf)
    }

    /// Returns the addresses of every device that acknowledges an empty write.
    pub fn scan(&mut self) -> Result<Vec<u8>, BusError> {
        let bus = Self::open(&mut self.connector, self.pins, &mut self.bus)?;
        let found = SCAN_RANGE
            .filter(|&address| bus.write(address, &[]).is_ok())
            .collect();
        Ok(found)
    }

    fn open<'bus>(
        connector: &mut C,
        pins: BusPins,
        bus: &'bus mut Option<C::Bus>,
    ) -> Result<&'bus mut C::Bus, BusError> {
        if bus.is_none() {
            log::info!(target: TARGET, "opening I2C bus (SDA: {}, SCL: {})", pins.sda, pins.scl);
            let opened = connector
                .connect(pins)
                .map_err(|error| BusError::Unavailable(format!("{error:#}")))?;
            *bus = Some(opened);
        }

        bus.as_mut()
            .ok_or_else(|| BusError::Unavailable("bus handle missing after open".into()))
    }
}

impl<C: Connect, D> fmt::Debug for BusTransport<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusTransport")
            .field("pins", &self.pins)
            .field("open", &self.bus.is_some())
            .field("retry", &self.retry)
            .field("settle_ms", &self.settle_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Debug, Default)]
    struct State {
        opened: usize,
        write_failures: usize,
        writes: Vec<(u8, Vec<u8>)>,
        present: Vec<u8>,
    }

    #[derive(Clone, Default)]
    struct Fake(Rc<RefCell<State>>);

    impl i2c::Write for Fake {
        type Error = &'static str;

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
            let mut state = self.0.borrow_mut();
            if bytes.is_empty() {
                return if state.present.contains(&address) {
                    Ok(())
                } else {
                    Err("nack")
                };
            }
            if state.write_failures > 0 {
                state.write_failures -= 1;
                return Err("arbitration lost");
            }
            state.writes.push((address, bytes.to_vec()));
            Ok(())
        }
    }

    impl i2c::Read for Fake {
        type Error = &'static str;

        fn read(&mut self, _: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8 + 1;
            }
            Ok(())
        }
    }

    impl Connect for Fake {
        type Error = &'static str;
        type Bus = Fake;

        fn connect(&mut self, _: BusPins) -> anyhow::Result<Self::Bus> {
            self.0.borrow_mut().opened += 1;
            Ok(self.clone())
        }
    }

    #[derive(Clone, Default)]
    struct Sleeps(Rc<RefCell<Vec<u32>>>);

    impl DelayMs<u32> for Sleeps {
        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(ms);
        }
    }

    const PINS: BusPins = BusPins { sda: 0, scl: 1 };

    fn transport(fake: &Fake, sleeps: &Sleeps) -> BusTransport<Fake, Sleeps> {
        BusTransport::new(fake.clone(), PINS, sleeps.clone())
            .with_retry(3, 10)
            .with_settle_ms(100)
    }

    #[test]
    fn opens_lazily_and_once() {
        let fake = Fake::default();
        let mut bus = transport(&fake, &Sleeps::default());
        assert!(!bus.is_open());
        assert_eq!(fake.0.borrow().opened, 0);

        bus.write(0x58, &[0x20, 0x03]).unwrap();
        bus.read(0x58, 3).unwrap();
        bus.write(0x58, &[0x20, 0x08]).unwrap();

        assert!(bus.is_open());
        assert_eq!(fake.0.borrow().opened, 1);
    }

    #[test]
    fn write_retries_then_settles() {
        let fake = Fake::default();
        fake.0.borrow_mut().write_failures = 2;
        let sleeps = Sleeps::default();
        let mut bus = transport(&fake, &sleeps);

        bus.write(0x58, &[0x20, 0x08]).unwrap();

        assert_eq!(fake.0.borrow().writes, vec![(0x58, vec![0x20, 0x08])]);
        assert_eq!(*sleeps.0.borrow(), vec![10, 10, 100]);
    }

    #[test]
    fn write_surfaces_exhausted_retries() {
        let fake = Fake::default();
        fake.0.borrow_mut().write_failures = 100;
        let sleeps = Sleeps::default();
        let mut bus = transport(&fake, &sleeps);

        let err = bus.write(0x58, &[0x20, 0x08]).unwrap_err();
        assert_eq!(
            err,
            BusError::Write {
                address: 0x58,
                attempts: 4,
                reason: "\"arbitration lost\"".into(),
            }
        );
        // backoff between attempts, but no settle delay after a failure
        assert_eq!(*sleeps.0.borrow(), vec![10, 10, 10]);
    }

    #[test]
    fn read_returns_requested_length() {
        let fake = Fake::default();
        let mut bus = transport(&fake, &Sleeps::default());
        assert_eq!(bus.read(0x12, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn scan_finds_acknowledging_devices() {
        let fake = Fake::default();
        fake.0.borrow_mut().present = vec![0x58, 0x61, 0x03];
        let mut bus = transport(&fake, &Sleeps::default());

        // 0x03 is reserved and never probed
        assert_eq!(bus.scan().unwrap(), vec![0x58, 0x61]);
    }

    struct Broken;

    impl Connect for Broken {
        type Error = &'static str;
        type Bus = Fake;

        fn connect(&mut self, pins: BusPins) -> anyhow::Result<Self::Bus> {
            anyhow::bail!("no pull-ups on SDA {}", pins.sda)
        }
    }

    /// Fails to open until `failures` runs out.
    struct Flaky {
        failures: usize,
        fake: Fake,
    }

    impl Connect for Flaky {
        type Error = &'static str;
        type Bus = Fake;

        fn connect(&mut self, _: BusPins) -> anyhow::Result<Self::Bus> {
            if self.failures > 0 {
                self.failures -= 1;
                anyhow::bail!("bus held low");
            }
            Ok(self.fake.clone())
        }
    }

    #[test]
    fn failed_open_is_attempted_again() {
        let fake = Fake::default();
        let connector = Flaky {
            failures: 1,
            fake: fake.clone(),
        };
        let mut bus = BusTransport::new(connector, PINS, Sleeps::default());
        assert_eq!(
            bus.write(0x58, &[0x20, 0x03]),
            Err(BusError::Unavailable("bus held low".into()))
        );
        assert!(!bus.is_open());

        bus.write(0x58, &[0x20, 0x03]).unwrap();
        assert!(bus.is_open());
        assert_eq!(fake.0.borrow().writes, vec![(0x58, vec![0x20, 0x03])]);
    }

    #[test]
    fn unavailable_bus_is_reported() {
        let mut bus = BusTransport::new(Broken, PINS, Sleeps::default());
        assert_eq!(
            bus.write(0x58, &[0x20, 0x03]),
            Err(BusError::Unavailable("no pull-ups on SDA 0".into()))
        );
        assert!(!bus.is_open());
    }
}
