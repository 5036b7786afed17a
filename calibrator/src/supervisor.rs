use std::{path::PathBuf, sync::Arc};

use calibrator_common::{
    config::{SafeStateConfig, SupervisorConfig},
    resolve,
    schedule::wait_until,
    CalibratorConfig, Resolution,
};
use chrono::{DateTime, FixedOffset};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    calibration_loop::{CalibrationLoop, WindowSummary},
    clock::{sleep_or_cancel, Clock},
    device::ThermostatClient,
    error::{CalibratorError, ErrorKind},
    schedule_reader::ScheduleReader,
    sensor_feed::SensorSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    Calibrated(WindowSummary),
    Idle {
        next_start: DateTime<FixedOffset>,
        slept: bool,
    },
}

pub struct Supervisor<C, S> {
    client: Arc<C>,
    reader: ScheduleReader<C>,
    calibration: CalibrationLoop<C, S>,
    clock: Arc<dyn Clock>,
    config: SupervisorConfig,
    safe_state: SafeStateConfig,
    restore_on_start: Option<PathBuf>,
    cancel: CancellationToken,
    consecutive_errors: u32,
    penalties: u32,
    last_failure: Option<ErrorKind>,
}

impl<C: ThermostatClient, S: SensorSource> Supervisor<C, S> {
    pub fn new(
        client: Arc<C>,
        sensor: S,
        clock: Arc<dyn Clock>,
        config: &CalibratorConfig,
        cancel: CancellationToken,
    ) -> Self {
        let calibration = CalibrationLoop::new(
            client.clone(),
            sensor,
            clock.clone(),
            config.calibration.clone(),
            cancel.clone(),
        );

        Self::with_calibration(client, calibration, clock, config, cancel)
    }

    pub fn with_calibration(
        client: Arc<C>,
        calibration: CalibrationLoop<C, S>,
        clock: Arc<dyn Clock>,
        config: &CalibratorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            reader: ScheduleReader::new(client.clone()),
            client,
            calibration,
            clock,
            config: config.supervisor.clone(),
            safe_state: config.safe_state.clone(),
            restore_on_start: config.device.restore_on_start.clone(),
            cancel,
            consecutive_errors: 0,
            penalties: 0,
            last_failure: None,
        }
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn penalties(&self) -> u32 {
        self.penalties
    }

    pub fn last_failure(&self) -> Option<ErrorKind> {
        self.last_failure
    }

    pub async fn run(&mut self) {
        if let Some(path) = self.restore_on_start.clone() {
            match self.client.restore_config(&path).await {
                Ok(()) => info!(path = %path.display(), "restored baseline device configuration"),
                Err(err) => warn!(path = %path.display(), error = %err, "baseline restore failed"),
            }
        }

        info!("supervisor started");
        while self.step().await == Step::Continue {}
        info!(
            penalties = self.penalties(),
            failures = self.consecutive_errors(),
            last_failure = ?self.last_failure(),
            "supervisor stopped"
        );
    }

    pub async fn step(&mut self) -> Step {
        if self.cancel.is_cancelled() {
            return Step::Shutdown;
        }

        match self.iterate().await {
            Ok(iteration) => {
                if self.consecutive_errors > 0 {
                    info!(
                        failures = self.consecutive_errors,
                        "recovered after failed iterations"
                    );
                }
                self.consecutive_errors = 0;
                match iteration {
                    Iteration::Calibrated(summary) => debug!(
                        ticks = summary.ticks,
                        writes = summary.writes,
                        cancelled = summary.cancelled,
                        "active window finished"
                    ),
                    Iteration::Idle { next_start, slept } => {
                        debug!(%next_start, slept, "idle period finished")
                    }
                }
            }
            Err(err) => {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                self.last_failure = Some(err.kind());
                self.report(&err);

                let delay = if self.consecutive_errors > self.config.max_consecutive_errors {
                    self.penalties += 1;
                    warn!(
                        failures = self.consecutive_errors,
                        penalty_secs = self.config.penalty_secs,
                        "too many consecutive failures, backing off"
                    );
                    self.config.penalty()
                } else {
                    self.config.retry_delay()
                };

                if !sleep_or_cancel(delay, &self.cancel).await {
                    return Step::Shutdown;
                }
            }
        }

        if self.cancel.is_cancelled() {
            Step::Shutdown
        } else {
            Step::Continue
        }
    }

    fn report(&self, err: &CalibratorError) {
        match err.kind() {
            ErrorKind::Schedule => error!(
                error = %err,
                failures = self.consecutive_errors,
                "schedule cannot make progress; program at least one timeslot on the thermostat"
            ),
            kind => warn!(
                error = %err,
                ?kind,
                failures = self.consecutive_errors,
                "iteration failed"
            ),
        }
    }

    async fn iterate(&mut self) -> Result<Iteration, CalibratorError> {
        let now = self.clock.now();
        let windows = self.reader.fetch(now).await?;

        match resolve(now, &windows)? {
            Resolution::Active(window) => {
                let summary = self.calibration.run(window).await?;
                Ok(Iteration::Calibrated(summary))
            }
            Resolution::Idle { next_start } => {
                self.enter_safe_state().await?;

                let wait = wait_until(self.clock.now(), next_start);
                info!(%next_start, wait_secs = wait.as_secs(), "outside heating windows, idling");
                let slept = sleep_or_cancel(wait, &self.cancel).await;
                Ok(Iteration::Idle { next_start, slept })
            }
        }
    }

    async fn enter_safe_state(&self) -> Result<(), CalibratorError> {
        self.client.set_offset(0.0).await?;
        self.client
            .set_manual_target(self.safe_state.manual_temp_c)
            .await?;
        info!(
            manual_temp = self.safe_state.manual_temp_c,
            "device set to safe state"
        );
        Ok(())
    }
}
