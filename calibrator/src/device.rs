use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use calibrator_common::{
    config::DeviceConfig, types::parse_battery_percent, ThermostatReading, WeeklySchedule,
};
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::debug;

use crate::error::CalibratorError;

#[async_trait]
pub trait ThermostatClient: Send + Sync {
    async fn get_battery(&self) -> Result<u8, CalibratorError>;

    async fn get_temperatures(&self) -> Result<ThermostatReading, CalibratorError>;

    async fn set_offset(&self, offset_c: f32) -> Result<(), CalibratorError>;

    async fn set_manual_target(&self, temp_c: f32) -> Result<(), CalibratorError>;

    async fn set_datetime(&self, now: DateTime<FixedOffset>) -> Result<(), CalibratorError>;

    async fn get_schedule(&self) -> Result<WeeklySchedule, CalibratorError>;

    async fn restore_config(&self, path: &Path) -> Result<(), CalibratorError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceOp {
    GetBattery,
    GetTemperatures,
    GetDays,
    SetOffset(f32),
    SetManualTarget(f32),
    SetDatetime,
    Restore(PathBuf),
}

impl DeviceOp {
    fn is_read(&self) -> bool {
        matches!(self, Self::GetBattery | Self::GetTemperatures | Self::GetDays)
    }

    fn subcommand(&self) -> Vec<String> {
        match self {
            Self::GetBattery => vec!["get".into(), "battery".into()],
            Self::GetTemperatures => vec!["get".into(), "temperatures".into()],
            Self::GetDays => vec!["get".into(), "days".into()],
            Self::SetOffset(offset) => vec![
                "set".into(),
                "temperatures".into(),
                "--temp-offset".into(),
                format!("{offset:.1}"),
            ],
            Self::SetManualTarget(temp) => vec![
                "set".into(),
                "temperatures".into(),
                "--temp-manual".into(),
                format!("{temp:.1}"),
            ],
            Self::SetDatetime => vec!["set".into(), "datetime".into()],
            Self::Restore(path) => vec!["restore".into(), path.display().to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CometBlueClient {
    config: DeviceConfig,
}

impl CometBlueClient {
    pub fn new(config: DeviceConfig) -> Self {
        Self { config }
    }

    pub fn args(&self, op: &DeviceOp) -> Vec<String> {
        let mut args = Vec::new();
        if op.is_read() {
            args.extend(self.config.json_flag.iter().cloned());
        }
        args.push("device".to_string());
        if let Some(pin) = self.config.pin {
            args.push("-p".to_string());
            args.push(pin.to_string());
        }
        args.push(self.config.address.clone());
        args.extend(op.subcommand());
        args
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.config.program, args.join(" "))
    }

    async fn invoke(&self, op: &DeviceOp) -> Result<String, CalibratorError> {
        let args = self.args(op);
        let command = self.describe(&args);
        debug!(%command, "invoking device utility");

        let mut child = Command::new(&self.config.program);
        child.args(&args).stdin(Stdio::null()).kill_on_drop(true);

        let timeout = self.config.command_timeout();
        let output = match tokio::time::timeout(timeout, child.output()).await {
            Ok(result) => result.map_err(|source| CalibratorError::DeviceSpawn {
                command: command.clone(),
                source,
            })?,
            Err(_) => return Err(CalibratorError::DeviceTimeout { command, timeout }),
        };

        if !output.status.success() {
            return Err(CalibratorError::DeviceCommand {
                command,
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| CalibratorError::DeviceOutput {
            command,
            reason: "output is not valid UTF-8".to_string(),
        })
    }

    async fn invoke_json<T: DeserializeOwned>(&self, op: &DeviceOp) -> Result<T, CalibratorError> {
        let stdout = self.invoke(op).await?;
        parse_json(&stdout).map_err(|reason| CalibratorError::DeviceOutput {
            command: self.describe(&self.args(op)),
            reason,
        })
    }
}

fn parse_json<T: DeserializeOwned>(stdout: &str) -> Result<T, String> {
    serde_json::from_str(stdout.trim()).map_err(|err| err.to_string())
}

#[async_trait]
impl ThermostatClient for CometBlueClient {
    async fn get_battery(&self) -> Result<u8, CalibratorError> {
        let op = DeviceOp::GetBattery;
        let stdout = self.invoke(&op).await?;
        parse_battery_percent(&stdout).ok_or_else(|| CalibratorError::DeviceOutput {
            command: self.describe(&self.args(&op)),
            reason: format!("not a battery percentage: {:?}", stdout.trim()),
        })
    }

    async fn get_temperatures(&self) -> Result<ThermostatReading, CalibratorError> {
        self.invoke_json(&DeviceOp::GetTemperatures).await
    }

    async fn set_offset(&self, offset_c: f32) -> Result<(), CalibratorError> {
        self.invoke(&DeviceOp::SetOffset(offset_c)).await.map(drop)
    }

    async fn set_manual_target(&self, temp_c: f32) -> Result<(), CalibratorError> {
        self.invoke(&DeviceOp::SetManualTarget(temp_c))
            .await
            .map(drop)
    }

    async fn set_datetime(&self, now: DateTime<FixedOffset>) -> Result<(), CalibratorError> {
        debug!(%now, "syncing device clock");
        self.invoke(&DeviceOp::SetDatetime).await.map(drop)
    }

    async fn get_schedule(&self) -> Result<WeeklySchedule, CalibratorError> {
        self.invoke_json(&DeviceOp::GetDays).await
    }

    async fn restore_config(&self, path: &Path) -> Result<(), CalibratorError> {
        self.invoke(&DeviceOp::Restore(path.to_path_buf()))
            .await
            .map(drop)
    }
}
