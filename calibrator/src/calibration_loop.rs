use std::sync::Arc;

use calibrator_common::{
    calibration::offsets_match, config::CalibrationConfig, ActiveWindow, CalibrationCycleResult,
    OffsetCorrection,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    clock::{sleep_or_cancel, Clock},
    device::ThermostatClient,
    error::{CalibratorError, ErrorKind},
    sensor_feed::SensorSource,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSummary {
    pub ticks: u32,
    pub writes: u32,
    pub tick_failures: u32,
    pub cancelled: bool,
}

pub struct CalibrationLoop<C, S> {
    client: Arc<C>,
    sensor: S,
    clock: Arc<dyn Clock>,
    config: CalibrationConfig,
    rng: StdRng,
    cancel: CancellationToken,
}

impl<C: ThermostatClient, S: SensorSource> CalibrationLoop<C, S> {
    pub fn new(
        client: Arc<C>,
        sensor: S,
        clock: Arc<dyn Clock>,
        config: CalibrationConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            sensor,
            clock,
            config,
            rng: StdRng::from_os_rng(),
            cancel,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Ticks until `window.end`. Sensor and verification failures only cost
    /// the tick they happen in; device command failures end the window and
    /// are returned.
    pub async fn run(&mut self, window: ActiveWindow) -> Result<WindowSummary, CalibratorError> {
        info!(%window, "calibration window started");
        let mut summary = WindowSummary::default();

        while self.clock.now() < window.end {
            summary.ticks += 1;

            match self.tick().await {
                Ok(result) if result.changed => summary.writes += 1,
                Ok(_) => {}
                Err(err) if err.is_per_tick() => {
                    summary.tick_failures += 1;
                    if err.kind() == ErrorKind::Verification {
                        error!(error = %err, "offset write not confirmed, skipping this cycle");
                    } else {
                        warn!(error = %err, "ground truth unusable, skipping this cycle");
                    }
                }
                Err(err) => return Err(err),
            }

            self.housekeeping().await;

            // Fixed delay; time spent ticking is not subtracted.
            if !sleep_or_cancel(self.config.tick_interval(), &self.cancel).await {
                summary.cancelled = true;
                break;
            }
        }

        info!(
            ticks = summary.ticks,
            writes = summary.writes,
            failures = summary.tick_failures,
            "calibration window ended"
        );
        Ok(summary)
    }

    pub async fn tick(&self) -> Result<CalibrationCycleResult, CalibratorError> {
        let sensor = self.sensor.read()?;
        let reading = self.client.get_temperatures().await?;

        let correction = OffsetCorrection::compute(sensor.temperature_c, &reading);
        info!(
            ground_truth = sensor.temperature_c,
            humidity = ?sensor.humidity,
            device_temp = reading.current_temp,
            device_offset = reading.offset_temp,
            device_raw = correction.device_raw_c,
            raw_offset = correction.raw_offset_c,
            offset = correction.offset_c,
            "calibration reading"
        );

        if !correction.within_limit(self.config.max_offset_c) {
            return Err(CalibratorError::OffsetLimit {
                offset: correction.offset_c,
                limit: self.config.max_offset_c,
            });
        }

        if !correction.needs_write() {
            info!(offset = correction.offset_c, "offset already correct");
            return Ok(CalibrationCycleResult::unchanged(correction));
        }

        self.client.set_offset(correction.offset_c).await?;

        let stored = self.client.get_temperatures().await?;
        if !offsets_match(stored.offset_temp, correction.offset_c) {
            return Err(CalibratorError::Verification {
                expected: correction.offset_c,
                reported: stored.offset_temp,
            });
        }

        info!(
            previous = correction.existing_offset_c,
            offset = correction.offset_c,
            "offset updated"
        );
        Ok(CalibrationCycleResult::written(correction))
    }

    async fn housekeeping(&mut self) {
        if self.rng.random_bool(self.config.battery_probability) {
            match self.client.get_battery().await {
                Ok(percent) => info!(battery = percent, "battery level"),
                Err(err) => warn!(error = %err, "battery readout failed"),
            }
        }

        if self.rng.random_bool(self.config.datetime_sync_probability) {
            match self.client.set_datetime(self.clock.now()).await {
                Ok(()) => info!("device clock synced"),
                Err(err) => warn!(error = %err, "device clock sync failed"),
            }
        }
    }
}
