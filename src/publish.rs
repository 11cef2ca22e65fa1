/// Accepts serialized readings for delivery off the node.
///
/// The network layer implements this; the node only guarantees that
/// `payload` is the JSON serialization of a [`Snapshot`](crate::Snapshot).
pub trait Publisher {
    fn publish(&mut self, sensor: &str, topic: &str, payload: &[u8]) -> anyhow::Result<()>;
}

/// Logs every payload instead of sending it anywhere.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&mut self, sensor: &str, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
        let payload = std::str::from_utf8(payload)?;
        log::info!(target: "envnode::publish", "[{sensor}] {topic}: {payload}");
        Ok(())
    }
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish(&mut self, sensor: &str, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
        (**self).publish(sensor, topic, payload)
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, sensor: &str, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
        (**self).publish(sensor, topic, payload)
    }
}
