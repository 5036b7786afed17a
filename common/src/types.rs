use serde::Deserialize;

/// `get temperatures` output. `current_temp` already includes `offset_temp`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThermostatReading {
    pub current_temp: f32,
    pub offset_temp: f32,
    pub target_high: f32,
    #[serde(default)]
    pub target_low: Option<f32>,
    #[serde(default)]
    pub manual_temp: Option<f32>,
}

impl ThermostatReading {
    pub fn device_raw_temp(&self) -> f32 {
        self.current_temp - self.offset_temp
    }
}

pub fn parse_battery_percent(output: &str) -> Option<u8> {
    let trimmed = output.trim().trim_end_matches('%').trim();
    let value = trimmed.parse::<f32>().ok()?;
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Some(value.round() as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_device_json_and_ignores_unknown_fields() {
        let raw = r#"{
            "current_temp": 20.5,
            "offset_temp": -1.0,
            "target_high": 21.0,
            "target_low": 16.0,
            "window_open_detection": 4,
            "window_open_minutes": 10
        }"#;

        let reading: ThermostatReading = serde_json::from_str(raw).unwrap();

        assert_eq!(
            reading,
            ThermostatReading {
                current_temp: 20.5,
                offset_temp: -1.0,
                target_high: 21.0,
                target_low: Some(16.0),
                manual_temp: None,
            }
        );
        assert_eq!(reading.device_raw_temp(), 21.5);
    }

    #[test]
    fn battery_accepts_plain_and_percent_forms() {
        assert_eq!(parse_battery_percent("87\n"), Some(87));
        assert_eq!(parse_battery_percent(" 42 %"), Some(42));
        assert_eq!(parse_battery_percent("unknown"), None);
        assert_eq!(parse_battery_percent("255"), None);
    }
}
