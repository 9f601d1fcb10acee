//! Telemetry value model.
//!
//! A decoder turns raw input into an ordered list of [`TelemetryValue`]s.
//! Each value carries its wire field name, the decoded value, and the fixed
//! display metadata (unit, icon, device/state class, default-enabled flag)
//! baked in per field by the decoder tables.

use serde::{Deserialize, Serialize};

/// Value of a single decoded measurement.
///
/// The variant doubles as the measurement kind: it selects the hub component
/// (`binary_sensor` for booleans, `sensor` otherwise) and the value-extraction
/// template used in discovery documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this value maps to the `binary_sensor` component.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
        }
    }
}

impl std::fmt::Display for FieldValue {
    /// Renders the exact string published in state documents. Booleans
    /// render as `True`/`False`, matching the `payload_on`/`payload_off`
    /// literals announced for binary measurements.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", if *v { "True" } else { "False" }),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One decoded measurement with its display metadata.
///
/// Immutable once produced by a decoder. Metadata is fixed per field and
/// never derived from the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryValue {
    /// Wire field name, used as the JSON key in state documents.
    pub field: String,
    pub value: FieldValue,
    /// Human-readable name shown by the hub.
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub enabled_by_default: bool,
}

impl TelemetryValue {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<FieldValue>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            display_name: display_name.into(),
            device_class: None,
            state_class: None,
            unit: None,
            icon: None,
            category: None,
            enabled_by_default: true,
        }
    }

    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    pub fn with_state_class(mut self, state_class: impl Into<String>) -> Self {
        self.state_class = Some(state_class.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Mark the measurement's hub entity as disabled until a user opts in.
    pub fn disabled_by_default(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rendering() {
        assert_eq!(FieldValue::Bool(true).to_string(), "True");
        assert_eq!(FieldValue::Bool(false).to_string(), "False");
        assert_eq!(FieldValue::Float(23.5).to_string(), "23.5");
        assert_eq!(FieldValue::Int(14).to_string(), "14");
        assert_eq!(
            FieldValue::Text("Leistungsbrand".to_string()).to_string(),
            "Leistungsbrand"
        );
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(FieldValue::Float(3.25).as_f64(), Some(3.25));
        assert_eq!(FieldValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(FieldValue::Bool(true).as_bool(), Some(true));
        assert_eq!(FieldValue::Text("x".into()).as_str(), Some("x"));
        assert!(FieldValue::Bool(false).is_binary());
        assert!(!FieldValue::Float(0.0).is_binary());
    }

    #[test]
    fn test_builder_metadata() {
        let value = TelemetryValue::new("temperatur_kessel", 68.0, "Temperatur Kessel")
            .with_device_class("temperature")
            .with_state_class("measurement")
            .with_unit("°C");

        assert_eq!(value.field, "temperatur_kessel");
        assert_eq!(value.device_class.as_deref(), Some("temperature"));
        assert_eq!(value.unit.as_deref(), Some("°C"));
        assert!(value.enabled_by_default);
        assert!(value.icon.is_none());

        let disabled = TelemetryValue::new("rost", false, "Rost").disabled_by_default();
        assert!(!disabled.enabled_by_default);
    }
}
