pub mod calibration;
pub mod config;
pub mod schedule;
pub mod sensor;
pub mod types;

pub use calibration::{CalibrationCycleResult, OffsetCorrection};
pub use config::CalibratorConfig;
pub use schedule::{
    resolve, ActiveWindow, DayOfWeek, RawTimeSlot, Resolution, ScheduleError, TimeSlot,
    WeeklySchedule,
};
pub use sensor::{SensorFeedError, SensorReading};
pub use types::ThermostatReading;
