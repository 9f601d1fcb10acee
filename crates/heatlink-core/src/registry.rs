//! Identity registry for heating systems, sensor channels, and measurements.
//!
//! The registry decides, for every observed entity in the
//! system → sensor → measurement hierarchy, whether it has been seen before
//! and therefore whether a one-time discovery announcement is still owed.
//! Creation is the only mutation point; lookups are pure. Entities are
//! created lazily on first observation and live for the process lifetime.
//!
//! There is no global instance: a [`Registry`] is constructed once at
//! startup and passed to every cycle. Hosts that drive cycles concurrently
//! must serialize access so a full [`Registry::register`] batch stays atomic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::discovery::DeviceInfo;
use crate::value::TelemetryValue;

/// Derive a stable lookup id from a human-readable name: every character
/// outside `[a-zA-Z0-9_-]` becomes `_`, the rest is lower-cased.
/// Deterministic, idempotent, and total over its input.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Registry construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Topic prefix for recurring state publications.
    #[serde(default = "default_state_prefix")]
    pub state_prefix: String,

    /// Topic prefix for one-time discovery documents.
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,

    /// Manufacturer reported in every system's device metadata block.
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    /// Model reported in every system's device metadata block.
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_state_prefix() -> String {
    "hargassner".to_string()
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

fn default_manufacturer() -> String {
    "Hargassner".to_string()
}

fn default_model() -> String {
    "Hargassner Bridge".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            state_prefix: default_state_prefix(),
            discovery_prefix: default_discovery_prefix(),
            manufacturer: default_manufacturer(),
            model: default_model(),
        }
    }
}

/// Outcome of registering one decode cycle's values.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Whether any of the three levels was newly created.
    pub any_created: bool,
    /// Whether the sensor channel itself was created this cycle.
    pub sensor_created: bool,
    pub system_id: String,
    pub sensor_id: String,
    /// Measurement ids created this cycle, in observation order. Each one
    /// needs its discovery announcement before any state publication that
    /// references it.
    pub new_fields: Vec<String>,
}

/// One measurement slot under a sensor channel.
///
/// Created at most once per (system, sensor, field); later sightings only
/// refresh [`Measurement::last_value`].
#[derive(Debug, Clone)]
pub struct Measurement {
    id: String,
    component: String,
    discovery_topic: String,
    unique_id: String,
    default_entity_id: String,
    announced: bool,
    last_value: TelemetryValue,
}

impl Measurement {
    fn new(
        state_prefix: &str,
        discovery_prefix: &str,
        system_id: &str,
        sensor_id: &str,
        value: &TelemetryValue,
    ) -> Self {
        let id = sanitize(&value.field);
        let component = if value.value.is_binary() {
            "binary_sensor"
        } else {
            "sensor"
        };
        let discovery_topic = format!(
            "{}/{}/{}/{}_{}/config",
            discovery_prefix, component, system_id, sensor_id, id
        );
        let unique_id = format!("{}.{}_{}_{}", state_prefix, system_id, sensor_id, id);
        let default_entity_id = format!("{}.{}", component, unique_id);

        debug!(
            measurement = %id,
            name = %value.display_name,
            topic = %discovery_topic,
            "created measurement"
        );

        Self {
            id,
            component: component.to_string(),
            discovery_topic,
            unique_id,
            default_entity_id,
            announced: true,
            last_value: value.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hub component kind: `binary_sensor` for boolean measurements,
    /// `sensor` for everything else.
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn discovery_topic(&self) -> &str {
        &self.discovery_topic
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn default_entity_id(&self) -> &str {
        &self.default_entity_id
    }

    /// Whether the one-time discovery announcement has been handed off.
    /// Set at creation and never reverts.
    pub fn is_announced(&self) -> bool {
        self.announced
    }

    pub fn last_value(&self) -> &TelemetryValue {
        &self.last_value
    }
}

/// One physical data source under a heating system.
#[derive(Debug, Clone)]
pub struct SensorChannel {
    id: String,
    name: String,
    system_id: String,
    state_topic: String,
    enabled: bool,
    measurements: HashMap<String, Measurement>,
    // Cloned from the registry config at creation so derived topics stay
    // pure functions of ids.
    state_prefix: String,
    discovery_prefix: String,
}

impl SensorChannel {
    fn new(
        state_prefix: &str,
        discovery_prefix: &str,
        system_id: &str,
        id: String,
        name: String,
    ) -> Self {
        let state_topic = format!("{}/{}/{}/data", state_prefix, system_id, id);
        debug!(sensor = %id, name = %name, topic = %state_topic, "created sensor channel");
        Self {
            id,
            name,
            system_id: system_id.to_string(),
            state_topic,
            enabled: false,
            measurements: HashMap::new(),
            state_prefix: state_prefix.to_string(),
            discovery_prefix: discovery_prefix.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the owning system (non-owning back-reference).
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn state_topic(&self) -> &str {
        &self.state_topic
    }

    /// A sensor becomes enabled when its first measurement is created and
    /// stays enabled for the process lifetime.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn measurement(&self, id: &str) -> Option<&Measurement> {
        self.measurements.get(id)
    }

    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.values()
    }

    /// Look up or create the measurement slot for a decoded value, keyed by
    /// the sanitized field name. On a repeat sighting only the stored last
    /// value is refreshed.
    pub fn get_or_create_measurement(
        &mut self,
        value: &TelemetryValue,
    ) -> (&mut Measurement, bool) {
        let id = sanitize(&value.field);
        let created = !self.measurements.contains_key(&id);
        if created {
            self.enabled = true;
        }
        let measurement = self
            .measurements
            .entry(id)
            .and_modify(|m| m.last_value = value.clone())
            .or_insert_with(|| {
                Measurement::new(
                    &self.state_prefix,
                    &self.discovery_prefix,
                    &self.system_id,
                    &self.id,
                    value,
                )
            });
        (measurement, created)
    }
}

/// One logical heating installation.
#[derive(Debug, Clone)]
pub struct HeatingSystem {
    id: String,
    name: String,
    device: DeviceInfo,
    enabled: bool,
    sensors: HashMap<String, SensorChannel>,
    state_prefix: String,
    discovery_prefix: String,
}

impl HeatingSystem {
    fn new(config: &RegistryConfig, sw_version: &str, id: String, name: String) -> Self {
        let device = DeviceInfo {
            identifiers: vec![format!("{}_bridge_{}", sanitize(&config.manufacturer), id)],
            model: config.model.clone(),
            name: format!("{} {}", config.manufacturer, name),
            sw_version: sw_version.to_string(),
            manufacturer: config.manufacturer.clone(),
        };
        debug!(system = %id, name = %name, "created heating system");
        Self {
            id,
            name,
            device,
            enabled: false,
            sensors: HashMap::new(),
            state_prefix: config.state_prefix.clone(),
            discovery_prefix: config.discovery_prefix.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device metadata block referenced by every discovery document of this
    /// system's measurements.
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Enabled once any measurement exists anywhere under this system;
    /// never cleared afterwards.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn sensor(&self, id: &str) -> Option<&SensorChannel> {
        self.sensors.get(id)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorChannel> {
        self.sensors.values()
    }

    /// Look up or create a sensor channel, keyed by the sanitized name.
    pub fn get_or_create_sensor(&mut self, name: &str) -> (&mut SensorChannel, bool) {
        let id = sanitize(name);
        let created = !self.sensors.contains_key(&id);
        let sensor = self.sensors.entry(id.clone()).or_insert_with(|| {
            SensorChannel::new(
                &self.state_prefix,
                &self.discovery_prefix,
                &self.id,
                id,
                name.to_string(),
            )
        });
        (sensor, created)
    }

    fn mark_enabled(&mut self) {
        self.enabled = true;
    }
}

/// Owns every observed system. Strict tree: systems own sensors, sensors own
/// measurements; children refer back to their parents by id only.
#[derive(Debug)]
pub struct Registry {
    config: RegistryConfig,
    sw_version: String,
    systems: HashMap<String, HeatingSystem>,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
            systems: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Version stamp reported in discovery documents.
    pub fn sw_version(&self) -> &str {
        &self.sw_version
    }

    pub fn system(&self, id: &str) -> Option<&HeatingSystem> {
        self.systems.get(id)
    }

    pub fn systems(&self) -> impl Iterator<Item = &HeatingSystem> {
        self.systems.values()
    }

    /// Look up or create a heating system, keyed by the sanitized name.
    pub fn get_or_create_system(&mut self, name: &str) -> (&mut HeatingSystem, bool) {
        let id = sanitize(name);
        let created = !self.systems.contains_key(&id);
        let system = self.systems.entry(id.clone()).or_insert_with(|| {
            HeatingSystem::new(&self.config, &self.sw_version, id, name.to_string())
        });
        (system, created)
    }

    /// Register one cycle's decoded values for a sensor: get-or-create the
    /// system, the sensor, and every measurement, in that order. Creating a
    /// measurement enables the owning sensor and system (monotonic). The
    /// returned [`Registration`] lists the measurements that still owe a
    /// discovery announcement.
    pub fn register(
        &mut self,
        system_name: &str,
        sensor_name: &str,
        values: &[TelemetryValue],
    ) -> Registration {
        let (system, system_created) = self.get_or_create_system(system_name);
        let system_id = system.id.clone();
        let (sensor, sensor_created) = system.get_or_create_sensor(sensor_name);
        let sensor_id = sensor.id.clone();

        let mut new_fields = Vec::new();
        for value in values {
            let (measurement, created) = sensor.get_or_create_measurement(value);
            if created {
                new_fields.push(measurement.id.clone());
            }
        }

        if !new_fields.is_empty() {
            system.mark_enabled();
        }

        Registration {
            any_created: system_created || sensor_created || !new_fields.is_empty(),
            sensor_created,
            system_id,
            sensor_id,
            new_fields,
        }
    }
}
