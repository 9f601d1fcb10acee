//! Analog pressure sensor decoding.
//!
//! The heating-circuit pressure transducer reports 0.5–4.5 V for 0–5 bar;
//! readings outside 0.25–4.75 V indicate a wiring fault. One voltage sample
//! decodes into the pressure itself, a boolean fault flag, and a diagnostic
//! status text.

use heatlink_core::TelemetryValue;
use tracing::trace;

use crate::error::DecodeError;

/// Health classification of the transducer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureFault {
    Ok,
    ShortToGround,
    ShortToVcc,
}

impl PressureFault {
    pub fn is_fault(&self) -> bool {
        !matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for PressureFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Ok => "Ok",
            Self::ShortToGround => "Short to ground or not connected",
            Self::ShortToVcc => "Short to VCC",
        };
        write!(f, "{}", text)
    }
}

/// Classify the wiring state from the raw voltage.
pub fn classify(voltage: f64) -> PressureFault {
    if voltage < 0.25 {
        PressureFault::ShortToGround
    } else if voltage > 4.75 {
        PressureFault::ShortToVcc
    } else {
        PressureFault::Ok
    }
}

/// Transducer calibration: 0.5 V is 0 bar, 4 V span covers 5 bar. Clamped
/// at zero and rounded to two decimals.
fn volt_to_bar(voltage: f64) -> f64 {
    let bar = (voltage - 0.5) * 5.0 / 4.0;
    (bar.max(0.0) * 100.0).round() / 100.0
}

/// Decode one voltage sample into typed pressure measurements.
pub fn decode(voltage: f64) -> Result<Vec<TelemetryValue>, DecodeError> {
    if !voltage.is_finite() {
        return Err(DecodeError::Input);
    }
    let voltage = (voltage * 100_000.0).round() / 100_000.0;
    let fault = classify(voltage);
    trace!(voltage, ?fault, "decoded pressure sample");

    Ok(vec![
        TelemetryValue::new("heizungsdruck", volt_to_bar(voltage), "Heizungsdruck")
            .with_device_class("pressure")
            .with_state_class("measurement")
            .with_unit("bar")
            .with_icon("mdi:water-boiler"),
        TelemetryValue::new("heizungsdruck_stoerung", fault.is_fault(), "Heizungsdruck Störung")
            .with_device_class("problem"),
        TelemetryValue::new(
            "heizungsdruck_statusnachricht",
            fault.to_string(),
            "Heizungsdruck Status",
        )
        .with_category("diagnostic")
        .disabled_by_default(),
    ])
}
