use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub program: String,
    pub address: String,
    pub pin: Option<u32>,
    pub json_flag: Vec<String>,
    pub command_timeout_secs: u64,
    pub restore_on_start: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            program: "cometblue".to_string(),
            address: "80:30:DC:E9:4E:50".to_string(),
            pin: Some(1762),
            json_flag: vec!["-f".to_string(), "json".to_string()],
            command_timeout_secs: 60,
            restore_on_start: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub path: PathBuf,
    /// Zero disables the staleness check.
    pub stale_timeout_secs: u64,
    pub min_valid_c: f32,
    pub max_valid_c: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/current_temperature.txt"),
            stale_timeout_secs: 900,
            min_valid_c: -10.0,
            max_valid_c: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub tick_interval_secs: u64,
    pub battery_probability: f64,
    pub datetime_sync_probability: f64,
    /// Largest offset magnitude the device accepts; anything beyond it means
    /// the ground truth is suspect.
    pub max_offset_c: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 300,
            battery_probability: 0.05,
            datetime_sync_probability: 0.02,
            max_offset_c: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeStateConfig {
    pub manual_temp_c: f32,
}

impl Default for SafeStateConfig {
    fn default() -> Self {
        Self { manual_temp_c: 8.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// The penalty is served once the consecutive failure count exceeds this.
    pub max_consecutive_errors: u32,
    pub penalty_secs: u64,
    pub retry_delay_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 5,
            penalty_secs: 1_800,
            retry_delay_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibratorConfig {
    pub device: DeviceConfig,
    pub sensor: SensorConfig,
    pub calibration: CalibrationConfig,
    pub safe_state: SafeStateConfig,
    pub supervisor: SupervisorConfig,
    pub timezone: String,
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            sensor: SensorConfig::default(),
            calibration: CalibrationConfig::default(),
            safe_state: SafeStateConfig::default(),
            supervisor: SupervisorConfig::default(),
            timezone: "Europe/Berlin".to_string(),
        }
    }
}

impl CalibratorConfig {
    pub fn sanitize(&mut self) {
        self.device.sanitize();
        self.sensor.sanitize();
        self.calibration.sanitize();
        self.safe_state.sanitize();
        self.supervisor.sanitize();
    }
}

impl DeviceConfig {
    pub fn sanitize(&mut self) {
        if self.program.trim().is_empty() {
            self.program = Self::default().program;
        }
        self.command_timeout_secs = self.command_timeout_secs.clamp(1, 600);
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl SensorConfig {
    pub fn sanitize(&mut self) {
        if !self.min_valid_c.is_finite()
            || !self.max_valid_c.is_finite()
            || self.min_valid_c >= self.max_valid_c
        {
            let defaults = Self::default();
            self.min_valid_c = defaults.min_valid_c;
            self.max_valid_c = defaults.max_valid_c;
        }
    }
}

impl CalibrationConfig {
    pub fn sanitize(&mut self) {
        self.tick_interval_secs = self.tick_interval_secs.clamp(1, 86_400);
        self.battery_probability = clamp_probability(self.battery_probability);
        self.datetime_sync_probability = clamp_probability(self.datetime_sync_probability);
        if !self.max_offset_c.is_finite() {
            self.max_offset_c = Self::default().max_offset_c;
        }
        self.max_offset_c = self.max_offset_c.clamp(0.5, 10.0);
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

impl SafeStateConfig {
    pub fn sanitize(&mut self) {
        if !self.manual_temp_c.is_finite() {
            self.manual_temp_c = Self::default().manual_temp_c;
        }
        self.manual_temp_c = self.manual_temp_c.clamp(5.0, 29.5);
    }
}

impl SupervisorConfig {
    pub fn sanitize(&mut self) {
        self.penalty_secs = self.penalty_secs.max(1);
    }

    pub fn penalty(&self) -> Duration {
        Duration::from_secs(self.penalty_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
