//! Hub discovery documents.
//!
//! A newly created measurement is announced to the home-automation hub with
//! one retained config document on its discovery topic, following the MQTT
//! discovery convention:
//!
//! - `{discovery_prefix}/<component>/<system>/<object>/config`
//!
//! The document describes where state lives, how to extract the field from
//! the flat state payload, and which device the entity belongs to. It is
//! published exactly once per measurement; the caller gates on the
//! registry's created flag and the publisher does not re-check.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::registry::{HeatingSystem, Measurement, SensorChannel};
use crate::sink::{PublishError, PublishSink, Qos};
use crate::value::FieldValue;

/// Software name reported in the `origin` block of discovery documents.
pub const ORIGIN_NAME: &str = "heatlink";

/// Device metadata block shared by every entity of a system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub model: String,
    pub name: String,
    pub sw_version: String,
    pub manufacturer: String,
}

/// Origin stamp carried in every discovery document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginInfo {
    pub name: String,
    pub sw: String,
}

/// One entity's retained discovery/config document.
///
/// Optional members are omitted from the wire document when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub name: String,

    pub state_topic: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,

    #[serde(rename = "unit_of_measurement", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    pub device: DeviceInfo,

    pub origin: OriginInfo,

    pub unique_id: String,

    pub default_entity_id: String,

    pub enabled_by_default: bool,

    /// Component kind: `binary_sensor` or `sensor`.
    pub platform: String,

    /// QoS the hub should subscribe with.
    pub qos: u8,

    /// Template extracting this entity's field from the state document.
    pub value_template: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<String>,

    // Only present for binary measurements; the literals match how state
    // documents stringify booleans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<String>,
}

/// Value-extraction expression for a field, keyed on its kind. Numeric
/// kinds coerce with a zero fallback; everything else references the raw
/// field.
fn value_template(value: &FieldValue, field: &str) -> String {
    match value {
        FieldValue::Float(_) => format!("{{{{ value_json.{} | float(0) }}}}", field),
        FieldValue::Int(_) => format!("{{{{ value_json.{} | int(0) }}}}", field),
        FieldValue::Text(_) | FieldValue::Bool(_) => {
            format!("{{{{ value_json.{} }}}}", field)
        }
    }
}

impl DiscoveryConfig {
    /// Build the discovery document for a measurement. Pure: every input
    /// comes from the registry tree.
    pub fn for_measurement(
        system: &HeatingSystem,
        sensor: &SensorChannel,
        measurement: &Measurement,
    ) -> Self {
        let value = measurement.last_value();
        let binary = value.value.is_binary();
        Self {
            name: value.display_name.clone(),
            state_topic: sensor.state_topic().to_string(),
            device_class: value.device_class.clone(),
            state_class: value.state_class.clone(),
            unit: value.unit.clone(),
            device: system.device().clone(),
            origin: OriginInfo {
                name: ORIGIN_NAME.to_string(),
                sw: system.device().sw_version.clone(),
            },
            unique_id: measurement.unique_id().to_string(),
            default_entity_id: measurement.default_entity_id().to_string(),
            enabled_by_default: value.enabled_by_default,
            platform: measurement.component().to_string(),
            qos: 2,
            value_template: value_template(&value.value, &value.field),
            icon: value.icon.clone(),
            entity_category: value.category.clone(),
            payload_off: binary.then(|| "False".to_string()),
            payload_on: binary.then(|| "True".to_string()),
        }
    }
}

/// Emits the one-time discovery announcement for newly created measurements.
pub struct DiscoveryPublisher {
    sink: Arc<dyn PublishSink>,
}

impl DiscoveryPublisher {
    pub fn new(sink: Arc<dyn PublishSink>) -> Self {
        Self { sink }
    }

    /// Publish the retained config document for a measurement. Invoked only
    /// on first sight of the field, gated by the registry's created flag.
    pub async fn announce(
        &self,
        system: &HeatingSystem,
        sensor: &SensorChannel,
        measurement: &Measurement,
    ) -> Result<(), PublishError> {
        let config = DiscoveryConfig::for_measurement(system, sensor, measurement);
        let payload = serde_json::to_vec(&config)?;
        debug!(
            measurement = %measurement.id(),
            topic = %measurement.discovery_topic(),
            "announcing measurement"
        );
        self.sink
            .publish(
                measurement.discovery_topic(),
                payload,
                Qos::AtLeastOnce,
                true,
            )
            .await
    }
}
