use serde::{ser::SerializeMap, Serialize, Serializer};
use std::fmt;

/// One scan's worth of readings, tagged with the sensor that took them.
///
/// Serializes as `{"sensor": <name>, "data": {<measurement>: <value>, ...}}`,
/// with measurements in registration order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Snapshot {
    sensor: String,
    data: Readings,
}

/// The result of invoking one source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reading {
    Value(u64),
    /// The source could not be read. Serialized as `null`.
    Failed(String),
}

/// Ordered name/reading pairs, serialized as a map.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Readings(Vec<(String, Reading)>);

impl Snapshot {
    pub fn new(sensor: impl Into<String>) -> Self {
        Self {
            sensor: sensor.into(),
            data: Readings::default(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, reading: Reading) {
        self.data.0.push((name.into(), reading));
    }

    #[must_use]
    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn get(&self, name: &str) -> Option<&Reading> {
        self.data
            .0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, reading)| reading)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Reading)> + '_ {
        self.data.0.iter().map(|(name, reading)| (name.as_str(), reading))
    }

    /// Names of the sources that failed during this scan.
    pub fn failures(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter()
            .filter(|(_, reading)| matches!(reading, Reading::Failed(_)))
            .map(|(name, _)| name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.sensor)?;
        for (name, reading) in self.iter() {
            write!(f, " {name}: {reading}")?;
        }
        Ok(())
    }
}

// === impl Reading ===

impl Reading {
    #[must_use]
    pub fn value(&self) -> Option<u64> {
        match self {
            Reading::Value(value) => Some(*value),
            Reading::Failed(_) => None,
        }
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Value(value) => serializer.serialize_u64(*value),
            Reading::Failed(_) => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(value) => write!(f, "{value}"),
            Reading::Failed(error) => write!(f, "<error: {error}>"),
        }
    }
}

// === impl Readings ===

impl Serialize for Readings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
