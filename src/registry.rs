use crate::{
    adc::{AdcPins, Pin},
    error::RegistrationError,
    source::{Category, I2cCommand, Source, Transform},
    status::Status,
};
use std::collections::BTreeSet;

/// The node's named measurement sources, validated against the board's pin
/// constraints.
///
/// Sources are kept in two collections, one per [`Category`], each iterated
/// in registration order. Registering a name that already exists in a
/// collection replaces that entry in place.
#[derive(Debug)]
pub struct Registry {
    adc_pins: AdcPins,
    claimed: BTreeSet<Pin>,
    init: Vec<Entry>,
    measure: Vec<Entry>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    name: String,
    source: Source,
    status: Status,
}

const TARGET: &str = "envnode::registry";

impl Registry {
    /// Returns an empty registry. `reserved` pins (such as the I2C bus lines)
    /// are claimed up front and can never be used by a source.
    pub fn new(adc_pins: AdcPins, reserved: impl IntoIterator<Item = Pin>) -> Self {
        Self {
            adc_pins,
            claimed: reserved.into_iter().collect(),
            init: Vec::new(),
            measure: Vec::new(),
        }
    }

    /// Registers a measurement that samples the ADC on `pin`.
    pub fn register_analog(
        &mut self,
        name: impl Into<String>,
        pin: Pin,
    ) -> Result<(), RegistrationError> {
        if self.claimed.contains(&pin) {
            return Err(RegistrationError::PinConflict { pin });
        }

        if !self.adc_pins.contains(pin) {
            return Err(RegistrationError::InvalidPin { pin });
        }

        let name = name.into();
        log::debug!(target: TARGET, "registering analog source {name:?} on pin {pin}");
        self.claimed.insert(pin);
        self.insert(Category::Measure, name, Source::Analog { pin });
        Ok(())
    }

    /// Registers an I2C command. `category` must be `"init"` or `"measure"`.
    ///
    /// If a `transform` is given, it is applied to `command` now; the
    /// transformed bytes are what gets written when the source is invoked.
    pub fn register_i2c(
        &mut self,
        name: impl Into<String>,
        address: u8,
        command: &[u8],
        category: &str,
        transform: Option<Transform>,
    ) -> Result<(), RegistrationError> {
        let category = category.parse::<Category>()?;
        let mut cmd = I2cCommand::new(address, command);
        if let Some(transform) = transform {
            cmd = cmd.with_transform(transform);
        }
        self.register_command(name, category, cmd)
    }

    /// Registers a fully-built I2C command. Commands in the `init` category
    /// are write-only; their response length is ignored. Commands in the
    /// `measure` category must read at least one byte.
    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        category: Category,
        command: I2cCommand,
    ) -> Result<(), RegistrationError> {
        let command = match category {
            Category::Init => command.write_only(),
            Category::Measure if command.response_len() == 0 => {
                return Err(RegistrationError::EmptyResponse)
            }
            Category::Measure => command,
        };
        command.validate()?;

        let name = name.into();
        log::debug!(
            target: TARGET,
            "registering {category} command {name:?}: {:02x?} -> {:#04x}",
            command.command(),
            command.address(),
        );
        self.insert(category, name, Source::I2c(command));
        Ok(())
    }

    pub fn get(&self, category: Category, name: &str) -> Option<&Source> {
        self.entries(category)
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.source)
    }

    /// The status of the measurement named `name`.
    pub fn status(&self, name: &str) -> Option<Status> {
        self.measure
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.status)
    }

    /// Measurement sources, in registration order.
    pub fn measurements(&self) -> impl Iterator<Item = (&str, &Source)> + '_ {
        self.measure.iter().map(Entry::as_pair)
    }

    /// Setup sources, in registration order.
    pub fn init_sources(&self) -> impl Iterator<Item = (&str, &Source)> + '_ {
        self.init.iter().map(Entry::as_pair)
    }

    pub fn claimed_pins(&self) -> impl Iterator<Item = Pin> + '_ {
        self.claimed.iter().copied()
    }

    pub fn is_claimed(&self, pin: Pin) -> bool {
        self.claimed.contains(&pin)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.init.len() + self.measure.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if any source talks to the I2C bus.
    #[must_use]
    pub fn uses_bus(&self) -> bool {
        self.init
            .iter()
            .chain(&self.measure)
            .any(|entry| matches!(entry.source, Source::I2c(_)))
    }

    pub(crate) fn entries_mut(&mut self, category: Category) -> &mut [Entry] {
        match category {
            Category::Init => &mut self.init,
            Category::Measure => &mut self.measure,
        }
    }

    fn entries(&self, category: Category) -> &[Entry] {
        match category {
            Category::Init => &self.init,
            Category::Measure => &self.measure,
        }
    }

    fn insert(&mut self, category: Category, name: String, source: Source) {
        let entries = match category {
            Category::Init => &mut self.init,
            Category::Measure => &mut self.measure,
        };

        match entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                log::info!(target: TARGET, "replacing {category} source {name:?}");
                let old = std::mem::replace(entry, Entry::new(name, source));
                // the replaced source no longer needs its pin.
                if let Some(pin) = old.source.pin() {
                    self.claimed.remove(&pin);
                }
            }
            None => entries.push(Entry::new(name, source)),
        }
    }
}

// === impl Entry ===

impl Entry {
    fn new(name: String, source: Source) -> Self {
        Self {
            name,
            source,
            status: Status::Missing,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn record(&mut self, ok: bool) -> Status {
        let prev = self.status;
        self.status = prev.after(ok);
        prev
    }

    fn as_pair(&self) -> (&str, &Source) {
        (&self.name, &self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        // Pico W layout: I2C on GP0/GP1
        Registry::new(AdcPins::RP2040, [0, 1])
    }

    #[test]
    fn claimed_pins_conflict_regardless_of_name() {
        let mut registry = registry();
        registry.register_analog("soil", 28).unwrap();

        for name in ["soil", "light", ""] {
            assert_eq!(
                registry.register_analog(name, 28),
                Err(RegistrationError::PinConflict { pin: 28 })
            );
        }
        // the bus pins are claimed from the start
        assert_eq!(
            registry.register_analog("light", 0),
            Err(RegistrationError::PinConflict { pin: 0 })
        );
    }

    #[test]
    fn only_adc_pins_are_valid() {
        let mut registry = registry();
        for pin in (2..=40).filter(|pin| !AdcPins::RP2040.contains(*pin)) {
            assert_eq!(
                registry.register_analog("light", pin),
                Err(RegistrationError::InvalidPin { pin })
            );
            assert!(!registry.is_claimed(pin), "pin {pin} claimed by a failed registration");
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn distinct_pins_register() {
        let mut registry = registry();
        registry.register_analog("soil", 28).unwrap();
        registry.register_analog("light", 26).unwrap();

        let sources: Vec<_> = registry.measurements().collect();
        assert_eq!(
            sources,
            vec![
                ("soil", &Source::Analog { pin: 28 }),
                ("light", &Source::Analog { pin: 26 }),
            ]
        );
        assert_eq!(registry.claimed_pins().collect::<Vec<_>>(), vec![0, 1, 26, 28]);
    }

    #[test]
    fn bogus_category_mutates_nothing() {
        let mut registry = registry();
        assert_eq!(
            registry.register_i2c("co2", 0x58, &[0x20, 0x08], "bogus", None),
            Err(RegistrationError::InvalidCategory("bogus".into()))
        );
        assert!(registry.is_empty());
        assert!(!registry.uses_bus());
    }

    #[test]
    fn last_registration_wins_in_place() {
        let mut registry = registry();
        registry
            .register_i2c("temp", 0x44, &[0x24, 0x00], "measure", None)
            .unwrap();
        registry.register_analog("soil", 27).unwrap();
        registry
            .register_i2c("temp", 0x44, &[0x2c, 0x06], "measure", None)
            .unwrap();

        let names: Vec<_> = registry.measurements().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["temp", "soil"]);
        match registry.get(Category::Measure, "temp") {
            Some(Source::I2c(cmd)) => assert_eq!(cmd.command(), &[0x2c, 0x06]),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn replacing_an_analog_source_releases_its_pin() {
        let mut registry = registry();
        registry.register_analog("soil", 27).unwrap();
        registry.register_analog("soil", 28).unwrap();

        assert!(!registry.is_claimed(27));
        assert!(registry.is_claimed(28));
        registry.register_analog("light", 27).unwrap();
    }

    #[test]
    fn categories_are_separate() {
        let mut registry = registry();
        registry
            .register_i2c("air_quality", 0x58, &[0x20, 0x03], "init", None)
            .unwrap();
        registry
            .register_i2c("air_quality", 0x58, &[0x20, 0x08], "measure", None)
            .unwrap();

        assert_eq!(registry.len(), 2);
        match registry.get(Category::Init, "air_quality") {
            Some(Source::I2c(cmd)) => {
                assert_eq!(cmd.command(), &[0x20, 0x03]);
                assert_eq!(cmd.response_len(), 0);
            }
            other => panic!("unexpected source: {other:?}"),
        }
        match registry.get(Category::Measure, "air_quality") {
            Some(Source::I2c(cmd)) => assert_eq!(cmd.response_len(), 3),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn transformed_command_is_bound_at_registration() {
        let mut registry = registry();
        registry
            .register_i2c(
                "humidity_comp",
                0x58,
                &[0x20, 0x61, 0xbe, 0xef],
                "init",
                Some(crate::hash::sensirion_args),
            )
            .unwrap();
        match registry.get(Category::Init, "humidity_comp") {
            Some(Source::I2c(cmd)) => {
                assert_eq!(cmd.command(), &[0x20, 0x61, 0xbe, 0xef, 0x92])
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn init_commands_ignore_response_len() {
        let mut registry = registry();
        let cmd = I2cCommand::new(0x58, [0x20, 0x03]).with_response_len(16);
        registry
            .register_command("air_quality_init", Category::Init, cmd)
            .unwrap();
        match registry.get(Category::Init, "air_quality_init") {
            Some(Source::I2c(cmd)) => assert_eq!(cmd.response_len(), 0),
            other => panic!("unexpected source: {other:?}"),
        }

        // the limit still applies to measurements
        let cmd = I2cCommand::new(0x58, [0x20, 0x08]).with_response_len(16);
        assert_eq!(
            registry.register_command("air_quality", Category::Measure, cmd),
            Err(RegistrationError::ResponseTooLong(16))
        );
    }

    #[test]
    fn measurements_must_read_something() {
        let mut registry = registry();
        let cmd = I2cCommand::new(0x58, [0x20, 0x08]).with_response_len(0);
        assert_eq!(
            registry.register_command("air_quality", Category::Measure, cmd),
            Err(RegistrationError::EmptyResponse)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_ten_bit_addresses() {
        let mut registry = registry();
        assert_eq!(
            registry.register_i2c("co2", 0x80, &[0x00], "measure", None),
            Err(RegistrationError::InvalidAddress(0x80))
        );
        assert!(registry.is_empty());
    }
}
