use crate::publish::Publisher;
use anyhow::Context;
use embedded_svc::mqtt::client::{Publish, QoS};
use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};

/// Publishes readings to an MQTT broker, at most once, not retained.
pub struct MqttPublisher {
    client: EspMqttClient,
}

impl MqttPublisher {
    /// Connects to the broker at `url` (for example `mqtt://10.42.0.1`),
    /// identifying as `client_id`.
    pub fn connect(url: &str, client_id: &str) -> anyhow::Result<Self> {
        let config = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let client = EspMqttClient::new(url, &config, |event| match event {
            Ok(event) => log::debug!(target: "envnode::mqtt", "{event:?}"),
            Err(error) => log::warn!(target: "envnode::mqtt", "MQTT error: {error}"),
        })
        .with_context(|| format!("failed to connect to MQTT broker at {url}"))?;
        log::info!(target: "envnode::mqtt", "connected to {url} as {client_id}");
        Ok(Self { client })
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, sensor: &str, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
        let id = self
            .client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .with_context(|| format!("failed to publish {sensor} readings"))?;
        log::debug!(target: "envnode::mqtt", "published message {id} to {topic}");
        Ok(())
    }
}
