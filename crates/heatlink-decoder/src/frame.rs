//! Serial frame decoder.
//!
//! The boiler controller writes one ASCII telemetry line roughly every half
//! second: a `pm` marker followed by 40 space-separated tokens. Tokens
//! 1–15 are blower/fan/O2 percentages and temperature channels, token 29 is
//! the numeric status code, tokens 30–32 are motor currents, and tokens
//! 33–36 are 16-bit hex registers whose individual bits each represent one
//! boolean state. The remaining tokens are validated for count only.
//!
//! Field metadata (units, icons, device/state classes, default-enabled
//! flags) is baked into the channel and flag tables below, never derived
//! from input.

use heatlink_core::TelemetryValue;
use tracing::trace;

use crate::error::DecodeError;

/// Marker token opening every telemetry frame.
pub const FRAME_MARKER: &str = "pm";

/// Exact token count of a well-formed frame, marker included.
pub const FRAME_TOKEN_COUNT: usize = 41;

const STATUS_INDEX: usize = 29;
const REGISTER_INDEXES: [usize; 4] = [33, 34, 35, 36];

/// Fixed display metadata for one numeric channel of the frame.
struct ChannelSpec {
    index: usize,
    field: &'static str,
    display_name: &'static str,
    unit: &'static str,
    icon: Option<&'static str>,
    device_class: Option<&'static str>,
    enabled: bool,
}

impl ChannelSpec {
    const fn percent(
        index: usize,
        field: &'static str,
        display_name: &'static str,
        icon: &'static str,
    ) -> Self {
        Self {
            index,
            field,
            display_name,
            unit: "%",
            icon: Some(icon),
            device_class: None,
            enabled: true,
        }
    }

    const fn temperature(index: usize, field: &'static str, display_name: &'static str) -> Self {
        Self {
            index,
            field,
            display_name,
            unit: "°C",
            icon: None,
            device_class: Some("temperature"),
            enabled: true,
        }
    }

    const fn current(index: usize, field: &'static str, display_name: &'static str) -> Self {
        Self {
            index,
            field,
            display_name,
            unit: "A",
            icon: None,
            device_class: Some("current"),
            enabled: false,
        }
    }

    fn to_value(&self, number: f64) -> TelemetryValue {
        let mut value = TelemetryValue::new(self.field, number, self.display_name)
            .with_state_class("measurement")
            .with_unit(self.unit);
        if let Some(icon) = self.icon {
            value = value.with_icon(icon);
        }
        if let Some(device_class) = self.device_class {
            value = value.with_device_class(device_class);
        }
        if !self.enabled {
            value = value.disabled_by_default();
        }
        value
    }
}

/// One boolean flag extracted from a bitmask register.
struct FlagSpec {
    bit: u8,
    field: &'static str,
    display_name: &'static str,
    device_class: &'static str,
    enabled: bool,
    /// The flag is active while the bit is clear. Only the grate contact
    /// reports this way; see [`REGISTER4_FLAGS`].
    inverted: bool,
}

impl FlagSpec {
    const fn new(
        bit: u8,
        field: &'static str,
        display_name: &'static str,
        device_class: &'static str,
    ) -> Self {
        Self {
            bit,
            field,
            display_name,
            device_class,
            enabled: true,
            inverted: false,
        }
    }

    const fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    const fn bit_clear(self) -> Self {
        Self {
            inverted: true,
            ..self
        }
    }

    fn to_value(&self, register: u16) -> TelemetryValue {
        let mut active = (register >> self.bit) & 1 != 0;
        if self.inverted {
            active = !active;
        }
        let mut value = TelemetryValue::new(self.field, active, self.display_name)
            .with_device_class(self.device_class);
        if !self.enabled {
            value = value.disabled_by_default();
        }
        value
    }
}

const FLOAT_CHANNELS: &[ChannelSpec] = &[
    ChannelSpec::percent(1, "primaerluftgeblaese", "Primärluftgebläse", "mdi:fan-speed-1"),
    ChannelSpec::percent(2, "saugzuggeblaese", "Saugzuggebläse", "mdi:fan"),
    ChannelSpec::percent(3, "o2_im_rauchgas", "O2 im Rauchgas", "mdi:smoke"),
    ChannelSpec::temperature(4, "temperatur_kessel", "Temperatur Kessel"),
    ChannelSpec::temperature(5, "temperatur_rauchgas", "Temperatur Rauchgas"),
    ChannelSpec::temperature(6, "temperatur_aussen", "Temperatur Aussen"),
    ChannelSpec::temperature(7, "temperatur_aussen_mittel", "Temperatur Aussen Mittel"),
    ChannelSpec::temperature(8, "temperatur_heizkreis_1", "Temperatur Heizkreis 1"),
    ChannelSpec::temperature(9, "temperatur_heizkreis_2", "Temperatur Heizkreis 2"),
    ChannelSpec::temperature(10, "temperatur_heizkreis_1_soll", "Temperatur Heizkreis 1 Soll"),
    ChannelSpec::temperature(11, "temperatur_heizkreis_2_soll", "Temperatur Heizkreis 2 Soll"),
    ChannelSpec::temperature(12, "temperatur_ruecklauf", "Temperatur Rücklauf"),
    ChannelSpec::temperature(13, "temperatur_boiler", "Temperatur Boiler"),
    ChannelSpec::percent(14, "foerdermenge", "Fördermenge", "mdi:pine-tree-fire"),
    ChannelSpec::temperature(15, "temperatur_kessel_soll", "Temperatur Kessel Soll"),
];

const CURRENT_CHANNELS: &[ChannelSpec] = &[
    ChannelSpec::current(30, "einschubschnecke_strom", "Einschubschnecke Strom"),
    ChannelSpec::current(31, "raumaustragung_strom", "Raumaustragung Strom"),
    ChannelSpec::current(32, "ascheaustragung_strom", "Ascheaustragung Strom"),
];

const REGISTER1_FLAGS: &[FlagSpec] = &[
    FlagSpec::new(0, "einschubschnecke_vorwaerts", "Einschubschnecke Vorwärts", "running")
        .disabled(),
    FlagSpec::new(1, "einschubschnecke_rueckwaerts", "Einschubschnecke Rückwärts", "running")
        .disabled(),
    FlagSpec::new(2, "raumaustragung_vorwaerts", "Raumaustragung Vorwärts", "running").disabled(),
    FlagSpec::new(3, "raumaustragung_rueckwaerts", "Raumaustragung Rückwärts", "running")
        .disabled(),
    FlagSpec::new(4, "ascheaustragung_vorwaerts", "Ascheaustragung Vorwärts", "running")
        .disabled(),
    FlagSpec::new(5, "ascheaustragung_rueckwaerts", "Ascheaustragung Rückwärts", "running")
        .disabled(),
];

const REGISTER2_FLAGS: &[FlagSpec] = &[
    // Field name as sent by the controller firmware.
    FlagSpec::new(0, "branschutzklappe_motor", "Brandschutzklappe Motor", "running").disabled(),
    FlagSpec::new(1, "zuendung_geblaese", "Zündung Gebläse", "running"),
    FlagSpec::new(2, "zuendung_heizung", "Zündung Heizung", "running"),
    FlagSpec::new(3, "pumpe_fernleitung", "Pumpe Fernleitung", "running"),
    FlagSpec::new(4, "pumpe_boiler", "Pumpe Boiler", "running"),
    FlagSpec::new(5, "pumpe_heizkreis_1", "Pumpe Heizkreis 1", "running"),
    FlagSpec::new(6, "mischer_heizkreis_1_auf", "Mischer Heizkreis 1 Auf", "running").disabled(),
    FlagSpec::new(7, "mischer_heizkreis_1_zu", "Mischer Heizkreis 1 Zu", "running").disabled(),
    FlagSpec::new(8, "pumpe_heizkreis_2", "Pumpe Heizkreis 2", "running"),
    FlagSpec::new(9, "mischer_heizkreis_2_auf", "Mischer Heizkreis 2 Auf", "running").disabled(),
    FlagSpec::new(10, "mischer_heizkreis_2_zu", "Mischer Heizkreis 2 Zu", "running").disabled(),
    FlagSpec::new(11, "stoerung", "Störung", "problem"),
];

const REGISTER3_FLAGS: &[FlagSpec] =
    &[FlagSpec::new(3, "pumpe_ruecklauf", "Pumpe Rücklauf", "running")];

const REGISTER4_FLAGS: &[FlagSpec] = &[
    // The grate contact is the one flag reported active-low; confirmed
    // against the controller, do not "fix" the polarity.
    FlagSpec::new(7, "rost", "Rost", "opening").disabled().bit_clear(),
    FlagSpec::new(8, "brandschutzklappe", "Brandschutzklappe", "opening"),
    FlagSpec::new(9, "anforderung_externer_heizkreis", "Anforderung Ext. HK", "running"),
];

/// Controller status codes as shown on the boiler display. Unknown codes
/// fall back to the stringified number.
fn status_text(status: i64) -> String {
    match status {
        0 => "Aus".to_string(),
        6 => "BSK öffnet".to_string(),
        7 | 9 | 10 => "Zündung".to_string(),
        14 => "Leistungsbrand".to_string(),
        15 => "Gluterhaltung".to_string(),
        17 => "Entaschung in 10 min".to_string(),
        18 => "Entaschen".to_string(),
        _ => status.to_string(),
    }
}

fn parse_float(tokens: &[&str], index: usize) -> Result<f64, DecodeError> {
    tokens[index].parse().map_err(|_| DecodeError::Conversion {
        index,
        token: tokens[index].to_string(),
    })
}

fn parse_int(tokens: &[&str], index: usize) -> Result<i64, DecodeError> {
    tokens[index].parse().map_err(|_| DecodeError::Conversion {
        index,
        token: tokens[index].to_string(),
    })
}

fn parse_register(tokens: &[&str], index: usize) -> Result<u16, DecodeError> {
    u16::from_str_radix(tokens[index], 16).map_err(|_| DecodeError::Conversion {
        index,
        token: tokens[index].to_string(),
    })
}

/// Decode one trimmed telemetry line into the ordered value sequence.
pub fn decode(line: &str) -> Result<Vec<TelemetryValue>, DecodeError> {
    let line = line.trim();
    let tokens: Vec<&str> = line.split(' ').collect();

    if tokens.first() != Some(&FRAME_MARKER) {
        return Err(DecodeError::Format(format!(
            "missing {:?} marker",
            FRAME_MARKER
        )));
    }
    if tokens.len() != FRAME_TOKEN_COUNT {
        return Err(DecodeError::Format(format!(
            "expected {} tokens, got {}",
            FRAME_TOKEN_COUNT,
            tokens.len()
        )));
    }

    let mut values = Vec::with_capacity(42);

    for spec in FLOAT_CHANNELS {
        values.push(spec.to_value(parse_float(&tokens, spec.index)?));
    }

    let status = parse_int(&tokens, STATUS_INDEX)?;
    values.push(TelemetryValue::new("status", status, "Status").with_category("diagnostic"));
    values.push(TelemetryValue::new(
        "statusnachricht",
        status_text(status),
        "Statusnachricht",
    ));

    for spec in CURRENT_CHANNELS {
        values.push(spec.to_value(parse_float(&tokens, spec.index)?));
    }

    let register_flags = [
        REGISTER1_FLAGS,
        REGISTER2_FLAGS,
        REGISTER3_FLAGS,
        REGISTER4_FLAGS,
    ];
    for (index, flags) in REGISTER_INDEXES.into_iter().zip(register_flags) {
        let register = parse_register(&tokens, index)?;
        for flag in flags {
            values.push(flag.to_value(register));
        }
    }

    trace!(fields = values.len(), "decoded frame");
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlink_core::FieldValue;

    /// A well-formed frame with every parsed token overridable by index.
    fn frame_with(overrides: &[(usize, &str)]) -> String {
        let mut tokens: Vec<String> = vec!["0".to_string(); FRAME_TOKEN_COUNT];
        tokens[0] = FRAME_MARKER.to_string();
        for slot in tokens.iter_mut().take(16).skip(1) {
            *slot = "20.0".to_string();
        }
        tokens[STATUS_INDEX] = "14".to_string();
        for slot in tokens.iter_mut().take(33).skip(30) {
            *slot = "1.5".to_string();
        }
        for (index, token) in overrides {
            tokens[*index] = token.to_string();
        }
        tokens.join(" ")
    }

    fn field<'a>(values: &'a [TelemetryValue], name: &str) -> &'a TelemetryValue {
        values
            .iter()
            .find(|v| v.field == name)
            .unwrap_or_else(|| panic!("missing field {name}"))
    }

    #[test]
    fn test_valid_frame_decodes_full_sequence() {
        let values = decode(&frame_with(&[])).unwrap();
        assert_eq!(values.len(), 42);

        // Ordered: float channels first, then status pair, currents, flags.
        assert_eq!(values[0].field, "primaerluftgeblaese");
        assert_eq!(values[0].value, FieldValue::Float(20.0));
        assert_eq!(values[14].field, "temperatur_kessel_soll");
        assert_eq!(values[15].field, "status");
        assert_eq!(values[16].field, "statusnachricht");
        assert_eq!(values[17].field, "einschubschnecke_strom");
        assert_eq!(values[20].field, "einschubschnecke_vorwaerts");
        assert_eq!(values[41].field, "anforderung_externer_heizkreis");
    }

    #[test]
    fn test_channel_metadata_is_baked_in() {
        let values = decode(&frame_with(&[])).unwrap();

        let kessel = field(&values, "temperatur_kessel");
        assert_eq!(kessel.device_class.as_deref(), Some("temperature"));
        assert_eq!(kessel.unit.as_deref(), Some("°C"));
        assert_eq!(kessel.state_class.as_deref(), Some("measurement"));
        assert!(kessel.enabled_by_default);

        let fan = field(&values, "saugzuggeblaese");
        assert_eq!(fan.unit.as_deref(), Some("%"));
        assert_eq!(fan.icon.as_deref(), Some("mdi:fan"));

        let current = field(&values, "einschubschnecke_strom");
        assert_eq!(current.device_class.as_deref(), Some("current"));
        assert_eq!(current.unit.as_deref(), Some("A"));
        assert!(!current.enabled_by_default);

        let status = field(&values, "status");
        assert_eq!(status.category.as_deref(), Some("diagnostic"));
    }

    #[test]
    fn test_status_text_lookup() {
        let values = decode(&frame_with(&[(STATUS_INDEX, "14")])).unwrap();
        assert_eq!(
            field(&values, "statusnachricht").value,
            FieldValue::Text("Leistungsbrand".to_string())
        );

        let values = decode(&frame_with(&[(STATUS_INDEX, "0")])).unwrap();
        assert_eq!(
            field(&values, "statusnachricht").value,
            FieldValue::Text("Aus".to_string())
        );

        // Unmapped codes fall back to the stringified number.
        let values = decode(&frame_with(&[(STATUS_INDEX, "99")])).unwrap();
        assert_eq!(field(&values, "status").value, FieldValue::Int(99));
        assert_eq!(
            field(&values, "statusnachricht").value,
            FieldValue::Text("99".to_string())
        );
    }

    #[test]
    fn test_register_bit_isolation() {
        let values = decode(&frame_with(&[(33, "1")])).unwrap();
        assert_eq!(
            field(&values, "einschubschnecke_vorwaerts").value,
            FieldValue::Bool(true)
        );
        for name in [
            "einschubschnecke_rueckwaerts",
            "raumaustragung_vorwaerts",
            "raumaustragung_rueckwaerts",
            "ascheaustragung_vorwaerts",
            "ascheaustragung_rueckwaerts",
        ] {
            assert_eq!(field(&values, name).value, FieldValue::Bool(false));
        }
    }

    #[test]
    fn test_register2_flags() {
        // 0x802 = ignition fan + fault.
        let values = decode(&frame_with(&[(34, "802")])).unwrap();
        assert_eq!(field(&values, "zuendung_geblaese").value, FieldValue::Bool(true));
        assert_eq!(field(&values, "stoerung").value, FieldValue::Bool(true));
        assert_eq!(field(&values, "pumpe_boiler").value, FieldValue::Bool(false));
        assert_eq!(
            field(&values, "stoerung").device_class.as_deref(),
            Some("problem")
        );
    }

    #[test]
    fn test_grate_flag_is_active_low() {
        // Bit 7 clear: grate reported open.
        let values = decode(&frame_with(&[(36, "0")])).unwrap();
        assert_eq!(field(&values, "rost").value, FieldValue::Bool(true));

        // Bit 7 set: grate closed, other register-4 flags unaffected.
        let values = decode(&frame_with(&[(36, "180")])).unwrap();
        assert_eq!(field(&values, "rost").value, FieldValue::Bool(false));
        assert_eq!(
            field(&values, "brandschutzklappe").value,
            FieldValue::Bool(true)
        );
        assert_eq!(
            field(&values, "anforderung_externer_heizkreis").value,
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn test_wrong_marker_fails() {
        let line = frame_with(&[]).replacen("pm", "xx", 1);
        assert!(matches!(decode(&line), Err(DecodeError::Format(_))));
        assert!(matches!(decode(""), Err(DecodeError::Format(_))));
    }

    #[test]
    fn test_wrong_token_count_fails() {
        let short = frame_with(&[])
            .rsplit_once(' ')
            .map(|(head, _)| head.to_string())
            .unwrap();
        assert!(matches!(decode(&short), Err(DecodeError::Format(_))));

        let long = format!("{} 0", frame_with(&[]));
        assert!(matches!(decode(&long), Err(DecodeError::Format(_))));
    }

    #[test]
    fn test_unparsable_tokens_fail() {
        assert_eq!(
            decode(&frame_with(&[(1, "abc")])),
            Err(DecodeError::Conversion {
                index: 1,
                token: "abc".to_string()
            })
        );
        assert!(matches!(
            decode(&frame_with(&[(STATUS_INDEX, "14.5")])),
            Err(DecodeError::Conversion { index: 29, .. })
        ));
        assert!(matches!(
            decode(&frame_with(&[(33, "zz")])),
            Err(DecodeError::Conversion { index: 33, .. })
        ));
    }

    #[test]
    fn test_leading_whitespace_is_trimmed() {
        let line = format!("  {}\r\n", frame_with(&[]));
        assert!(decode(&line).is_ok());
    }
}
