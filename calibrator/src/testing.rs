use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use calibrator_common::{
    DayOfWeek, RawTimeSlot, SensorFeedError, SensorReading, ThermostatReading, WeeklySchedule,
};
use chrono::{DateTime, FixedOffset, TimeZone};

use crate::{device::ThermostatClient, error::CalibratorError, sensor_feed::SensorSource};

/// Jan 5, 2026 is a Monday.
pub fn fixed_time(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2026, 1, day, hour, minute, second)
        .unwrap()
}

pub fn week(days: &[(DayOfWeek, Vec<RawTimeSlot>)]) -> WeeklySchedule {
    let mut all = vec![Vec::new(); 7];
    for (day, slots) in days {
        all[day.index()] = slots.clone();
    }
    WeeklySchedule::new(all)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetBattery,
    GetTemperatures,
    SetOffset(f32),
    SetManualTarget(f32),
    SetDatetime,
    GetSchedule,
    Restore(PathBuf),
}

#[derive(Debug)]
struct FakeState {
    raw_temp: f32,
    offset: f32,
    manual_temp: f32,
    schedule: WeeklySchedule,
    schedule_failures: u32,
    fail_reads: bool,
    fail_safe_state: bool,
    drop_offset_writes: bool,
    calls: Vec<Call>,
}

/// In-memory thermostat: reports `raw_temp + offset` and records every call.
#[derive(Debug)]
pub struct FakeThermostat {
    state: Mutex<FakeState>,
}

fn device_failure(command: &str) -> CalibratorError {
    CalibratorError::DeviceCommand {
        command: format!("cometblue {command}"),
        exit_code: Some(1),
        stderr: "Could not connect to device".to_string(),
    }
}

impl FakeThermostat {
    pub fn new(raw_temp: f32, offset: f32) -> Self {
        Self {
            state: Mutex::new(FakeState {
                raw_temp,
                offset,
                manual_temp: 20.0,
                schedule: WeeklySchedule::new(vec![Vec::new(); 7]),
                schedule_failures: 0,
                fail_reads: false,
                fail_safe_state: false,
                drop_offset_writes: false,
                calls: Vec::new(),
            }),
        }
    }

    pub fn with_schedule(self, schedule: WeeklySchedule) -> Self {
        self.state.lock().unwrap().schedule = schedule;
        self
    }

    pub fn fail_schedule_fetches(&self, count: u32) {
        self.state.lock().unwrap().schedule_failures = count;
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }

    pub fn fail_safe_state(&self) {
        self.state.lock().unwrap().fail_safe_state = true;
    }

    /// Accept offset writes without storing them.
    pub fn drop_offset_writes(&self) {
        self.state.lock().unwrap().drop_offset_writes = true;
    }

    pub fn offset(&self) -> f32 {
        self.state.lock().unwrap().offset
    }

    pub fn manual_temp(&self) -> f32 {
        self.state.lock().unwrap().manual_temp
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn offset_writes(&self) -> Vec<f32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetOffset(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }
}

#[async_trait]
impl ThermostatClient for FakeThermostat {
    async fn get_battery(&self) -> Result<u8, CalibratorError> {
        self.state.lock().unwrap().calls.push(Call::GetBattery);
        Ok(87)
    }

    async fn get_temperatures(&self) -> Result<ThermostatReading, CalibratorError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetTemperatures);
        if state.fail_reads {
            return Err(device_failure("get temperatures"));
        }
        Ok(ThermostatReading {
            current_temp: state.raw_temp + state.offset,
            offset_temp: state.offset,
            target_high: 21.0,
            target_low: Some(16.0),
            manual_temp: Some(state.manual_temp),
        })
    }

    async fn set_offset(&self, offset_c: f32) -> Result<(), CalibratorError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::SetOffset(offset_c));
        if state.fail_safe_state && offset_c == 0.0 {
            return Err(device_failure("set temperatures"));
        }
        if !state.drop_offset_writes {
            state.offset = offset_c;
        }
        Ok(())
    }

    async fn set_manual_target(&self, temp_c: f32) -> Result<(), CalibratorError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::SetManualTarget(temp_c));
        state.manual_temp = temp_c;
        Ok(())
    }

    async fn set_datetime(&self, _now: DateTime<FixedOffset>) -> Result<(), CalibratorError> {
        self.state.lock().unwrap().calls.push(Call::SetDatetime);
        Ok(())
    }

    async fn get_schedule(&self) -> Result<WeeklySchedule, CalibratorError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetSchedule);
        if state.schedule_failures > 0 {
            state.schedule_failures -= 1;
            return Err(device_failure("get days"));
        }
        Ok(state.schedule.clone())
    }

    async fn restore_config(&self, path: &Path) -> Result<(), CalibratorError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Restore(path.to_path_buf()));
        Ok(())
    }
}

/// Fixed ground truth, or a missing sensor file.
#[derive(Debug)]
pub struct FakeSensor {
    temperature_c: Mutex<Option<f32>>,
}

impl FakeSensor {
    pub fn new(temperature_c: f32) -> Self {
        Self {
            temperature_c: Mutex::new(Some(temperature_c)),
        }
    }

    pub fn missing() -> Self {
        Self {
            temperature_c: Mutex::new(None),
        }
    }
}

impl SensorSource for FakeSensor {
    fn read(&self) -> Result<SensorReading, SensorFeedError> {
        match *self.temperature_c.lock().unwrap() {
            Some(temperature_c) => Ok(SensorReading {
                temperature_c,
                humidity: None,
            }),
            None => Err(SensorFeedError::Missing {
                path: PathBuf::from("/tmp/current_temperature.txt"),
            }),
        }
    }
}
