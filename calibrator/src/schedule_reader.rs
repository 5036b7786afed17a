use std::sync::Arc;

use calibrator_common::{ActiveWindow, ScheduleError};
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use crate::{device::ThermostatClient, error::CalibratorError};

pub struct ScheduleReader<C> {
    client: Arc<C>,
}

impl<C: ThermostatClient> ScheduleReader<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub async fn fetch(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<ActiveWindow>, CalibratorError> {
        let schedule = self.client.get_schedule().await?;
        let windows = schedule.windows_around(now).map_err(|err| match err {
            ScheduleError::InvalidTime { .. } => CalibratorError::DeviceOutput {
                command: "get days".to_string(),
                reason: err.to_string(),
            },
            other => CalibratorError::Schedule(other),
        })?;

        info!(date = %now.date_naive(), windows = windows.len(), "fetched device schedule");
        for window in &windows {
            debug!(%window, "scheduled window");
        }

        Ok(windows)
    }
}
