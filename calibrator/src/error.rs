use std::time::Duration;

use calibrator_common::{ScheduleError, SensorFeedError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    DeviceCommand,
    Verification,
    Schedule,
}

#[derive(Debug, Error)]
pub enum CalibratorError {
    #[error(transparent)]
    Sensor(#[from] SensorFeedError),

    #[error("`{command}` exited with status {exit_code:?}: {stderr}")]
    DeviceCommand {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    DeviceTimeout { command: String, timeout: Duration },

    #[error("failed to start `{command}`: {source}")]
    DeviceSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unparsable output from `{command}`: {reason}")]
    DeviceOutput { command: String, reason: String },

    #[error("computed offset {offset} exceeds the ±{limit} limit; ground truth reading is suspect")]
    OffsetLimit { offset: f32, limit: f32 },

    #[error("device reports offset {reported} after writing {expected}")]
    Verification { expected: f32, reported: f32 },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl CalibratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Sensor(_) | Self::OffsetLimit { .. } => ErrorKind::Io,
            Self::DeviceCommand { .. }
            | Self::DeviceTimeout { .. }
            | Self::DeviceSpawn { .. }
            | Self::DeviceOutput { .. } => ErrorKind::DeviceCommand,
            Self::Verification { .. } => ErrorKind::Verification,
            Self::Schedule(_) => ErrorKind::Schedule,
        }
    }

    pub fn is_per_tick(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io | ErrorKind::Verification)
    }
}
