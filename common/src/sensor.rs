use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorFeedError {
    #[error("sensor file {} does not exist", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read sensor file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sensor file is empty")]
    Empty,
    #[error("sensor temperature {line:?} is not a number")]
    Malformed { line: String },
    #[error("sensor reading is {age_secs}s old (limit {limit_secs}s)")]
    Stale { age_secs: u64, limit_secs: u64 },
    #[error("sensor temperature {value} is outside {min}..={max}")]
    OutOfRange { value: f32, min: f32, max: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature_c: f32,
    pub humidity: Option<f32>,
}

impl SensorReading {
    // Second line, if any, is humidity; an unreadable one is dropped.
    pub fn parse(content: &str) -> Result<Self, SensorFeedError> {
        let mut lines = content.lines().map(str::trim);

        let first = match lines.next() {
            Some(line) if !line.is_empty() => line,
            _ => return Err(SensorFeedError::Empty),
        };

        let temperature_c = first
            .parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| SensorFeedError::Malformed {
                line: first.to_string(),
            })?;

        let humidity = lines
            .next()
            .and_then(|line| line.parse::<f32>().ok())
            .filter(|value| value.is_finite() && (0.0..=100.0).contains(value));

        Ok(Self {
            temperature_c,
            humidity,
        })
    }

    pub fn check_range(self, min: f32, max: f32) -> Result<Self, SensorFeedError> {
        if (min..=max).contains(&self.temperature_c) {
            Ok(self)
        } else {
            Err(SensorFeedError::OutOfRange {
                value: self.temperature_c,
                min,
                max,
            })
        }
    }
}
