//! Bridge configuration.
//!
//! Loaded from a TOML file when one exists, then overlaid with `HEATLINK_*`
//! environment variables so deployments can inject connection settings
//! without editing the file.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use heatlink_core::RegistryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub mqtt: MqttSettings,
    pub serial: SerialSettings,
    pub adc: AdcSettings,
    pub bridge: BridgeSettings,
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "heatlink-bridge".to_string(),
            keep_alive: 60,
        }
    }
}

/// Controller serial line settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
    pub read_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyS0".to_string(),
            baud: 19200,
            read_timeout_ms: 2000,
        }
    }
}

/// Pressure transducer ADC settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcSettings {
    /// Kernel-exported raw sample file (IIO sysfs style).
    pub value_path: String,
    /// Volts per raw count.
    pub scale: f64,
}

impl Default for AdcSettings {
    fn default() -> Self {
        Self {
            value_path: "/sys/bus/iio/devices/iio:device0/in_voltage0_raw".to_string(),
            // ADS1115 at gain 2/3: 0.1875 mV per count.
            scale: 0.000_187_5,
        }
    }
}

/// Identity and cadence of the bridge itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub system_name: String,
    pub sensor_name: String,
    pub state_prefix: String,
    pub discovery_prefix: String,
    /// Seconds between cycles while nothing was published.
    pub poll_interval_secs: u64,
    /// Seconds to idle after a successful publication.
    pub publish_hold_secs: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            system_name: "HSV30".to_string(),
            sensor_name: "Lambdatronic".to_string(),
            state_prefix: "hargassner".to_string(),
            discovery_prefix: "homeassistant".to_string(),
            poll_interval_secs: 3,
            publish_hold_secs: 16,
        }
    }
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            info!(path = %path.display(), "loading config file");
            toml::from_str(&std::fs::read_to_string(path)?)?
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = env::var("HEATLINK_MQTT_HOST") {
            self.mqtt.host = host;
        }
        if let Ok(port) = env::var("HEATLINK_MQTT_PORT") {
            match port.parse() {
                Ok(port) => self.mqtt.port = port,
                Err(_) => warn!(port = %port, "ignoring invalid HEATLINK_MQTT_PORT"),
            }
        }
        if let Ok(username) = env::var("HEATLINK_MQTT_USERNAME") {
            self.mqtt.username = Some(username);
        }
        if let Ok(password) = env::var("HEATLINK_MQTT_PASSWORD") {
            self.mqtt.password = Some(password);
        }
        if let Ok(port) = env::var("HEATLINK_SERIAL_PORT") {
            self.serial.port = port;
        }
        if let Ok(path) = env::var("HEATLINK_ADC_PATH") {
            self.adc.value_path = path;
        }
    }

    /// Registry parameters derived from the bridge settings.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            state_prefix: self.bridge.state_prefix.clone(),
            discovery_prefix: self.bridge.discovery_prefix.clone(),
            ..RegistryConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.serial.baud, 19200);
        assert_eq!(config.bridge.system_name, "HSV30");
        assert_eq!(config.bridge.sensor_name, "Lambdatronic");
        assert_eq!(config.bridge.state_prefix, "hargassner");
        assert_eq!(config.bridge.discovery_prefix, "homeassistant");
    }

    #[test]
    fn test_load_toml_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[serial]
port = "/dev/ttyUSB0"

[bridge]
state_prefix = "boiler"
"#
        )
        .unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        // Unset fields keep their defaults.
        assert_eq!(config.serial.baud, 19200);
        assert_eq!(config.bridge.state_prefix, "boiler");
        assert_eq!(config.bridge.discovery_prefix, "homeassistant");

        let registry = config.registry_config();
        assert_eq!(registry.state_prefix, "boiler");
        assert_eq!(registry.manufacturer, "Hargassner");
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[serial]\nbaud = \"fast\"\n").unwrap();
        assert!(matches!(
            BridgeConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("HEATLINK_MQTT_HOST", "broker.lan");
        env::set_var("HEATLINK_MQTT_PORT", "8883");

        let mut config = BridgeConfig::default();
        config.apply_env();
        assert_eq!(config.mqtt.host, "broker.lan");
        assert_eq!(config.mqtt.port, 8883);

        env::set_var("HEATLINK_MQTT_PORT", "not-a-port");
        config.apply_env();
        // Invalid values are ignored, not fatal.
        assert_eq!(config.mqtt.port, 8883);

        env::remove_var("HEATLINK_MQTT_HOST");
        env::remove_var("HEATLINK_MQTT_PORT");
    }
}
