//! One register → announce → publish cycle.
//!
//! [`Pipeline`] glues the registry to the two publishers: decoded values go
//! through [`Registry::register`], any newly created measurement is
//! announced first, and the sensor's state document goes out last. The
//! pipeline is a single-writer structure; hosts driving cycles from more
//! than one task must wrap it in a mutex so a cycle is never interrupted
//! mid-registration.

use std::sync::Arc;

use tracing::info;

use crate::discovery::DiscoveryPublisher;
use crate::registry::{Registry, RegistryConfig};
use crate::sink::{PublishError, PublishSink};
use crate::state::StatePublisher;
use crate::value::TelemetryValue;

pub struct Pipeline {
    registry: Registry,
    discovery: DiscoveryPublisher,
    state: StatePublisher,
}

impl Pipeline {
    pub fn new(config: RegistryConfig, sink: Arc<dyn PublishSink>) -> Self {
        Self {
            registry: Registry::new(config),
            discovery: DiscoveryPublisher::new(sink.clone()),
            state: StatePublisher::new(sink),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one cycle for a batch of values decoded from one sensor source.
    /// Discovery announcements for first-seen measurements always precede
    /// the state publication that references them.
    pub async fn run_cycle(
        &mut self,
        system_name: &str,
        sensor_name: &str,
        values: &[TelemetryValue],
    ) -> Result<(), PublishError> {
        let registration = self.registry.register(system_name, sensor_name, values);

        let Some(system) = self.registry.system(&registration.system_id) else {
            return Ok(());
        };
        let Some(sensor) = system.sensor(&registration.sensor_id) else {
            return Ok(());
        };

        for field in &registration.new_fields {
            if let Some(measurement) = sensor.measurement(field) {
                self.discovery.announce(system, sensor, measurement).await?;
            }
        }

        if registration.sensor_created && sensor.is_enabled() {
            info!(topic = %sensor.state_topic(), "added sensor channel");
        }

        self.state.publish(sensor, values).await?;
        Ok(())
    }
}
