//! MQTT publish sink backed by rumqttc.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use heatlink_core::{PublishError, PublishSink, Qos};

use crate::config::MqttSettings;

fn to_mqtt_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Publish sink driving a rumqttc client. The event loop runs in a spawned
/// task and handles reconnection; the bridge only ever publishes.
pub struct MqttSink {
    client: AsyncClient,
}

impl MqttSink {
    /// Build the client and spawn the event-loop driver. Must be called
    /// from within a tokio runtime.
    pub fn connect(settings: &MqttSettings) -> Self {
        let mut options = MqttOptions::new(
            settings.client_id.clone(),
            settings.host.clone(),
            settings.port,
        );
        options.set_keep_alive(Duration::from_secs(settings.keep_alive));
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 10);
        info!(host = %settings.host, port = settings.port, "connecting to mqtt broker");

        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("mqtt connected");
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        // No write-back path; inbound traffic is observed only.
                        debug!(
                            topic = %publish.topic,
                            bytes = publish.payload.len(),
                            "ignoring inbound message"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "mqtt connection error, retrying");
                        tokio::time::sleep(Duration::from_secs(3)).await;
                    }
                }
            }
        });

        Self { client }
    }
}

#[async_trait]
impl PublishSink for MqttSink {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
        retain: bool,
    ) -> Result<(), PublishError> {
        self.client
            .publish(topic, to_mqtt_qos(qos), retain, payload)
            .await
            .map_err(|e| PublishError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_mapping() {
        assert_eq!(to_mqtt_qos(Qos::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(to_mqtt_qos(Qos::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(to_mqtt_qos(Qos::ExactlyOnce), QoS::ExactlyOnce);
    }
}
