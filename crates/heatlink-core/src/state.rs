//! Recurring sensor state publication.
//!
//! Once per decode cycle, every sensor channel that produced data gets one
//! flat `field -> stringified value` JSON document on its state topic,
//! delivered non-retained. Sensors without any enabled measurement are
//! skipped entirely.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::trace;

use crate::registry::SensorChannel;
use crate::sink::{PublishError, PublishSink, Qos};
use crate::value::TelemetryValue;

pub struct StatePublisher {
    sink: Arc<dyn PublishSink>,
}

impl StatePublisher {
    pub fn new(sink: Arc<dyn PublishSink>) -> Self {
        Self { sink }
    }

    /// Publish the current cycle's values for one sensor channel. Returns
    /// whether anything was published; a disabled sensor is a no-op.
    pub async fn publish(
        &self,
        sensor: &SensorChannel,
        values: &[TelemetryValue],
    ) -> Result<bool, PublishError> {
        if !sensor.is_enabled() {
            return Ok(false);
        }

        let mut document = serde_json::Map::new();
        for value in values {
            document.insert(
                value.field.clone(),
                JsonValue::String(value.value.to_string()),
            );
        }
        let payload = serde_json::to_vec(&JsonValue::Object(document))?;

        trace!(topic = %sensor.state_topic(), fields = values.len(), "publishing state");
        self.sink
            .publish(sensor.state_topic(), payload, Qos::AtMostOnce, false)
            .await?;
        Ok(true)
    }
}
