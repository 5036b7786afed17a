use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Weekday};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub fn index(self) -> usize {
        match self {
            Self::Mon => 0,
            Self::Tue => 1,
            Self::Wed => 2,
            Self::Thu => 3,
            Self::Fri => 4,
            Self::Sat => 5,
            Self::Sun => 6,
        }
    }

    pub fn from_chrono(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
            Weekday::Sun => Self::Sun,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error(
        "no active or upcoming timeslot after {now}: the device schedule has no usable slot today or tomorrow"
    )]
    Exhausted { now: DateTime<FixedOffset> },
    #[error("invalid time of day {value:?} in the {day:?} schedule")]
    InvalidTime { day: DayOfWeek, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawTimeSlot {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl RawTimeSlot {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
        }
    }

    pub fn normalize(&self, day: DayOfWeek) -> Result<Option<TimeSlot>, ScheduleError> {
        let start = self.start.as_deref().filter(|value| !value.trim().is_empty());
        let end = self.end.as_deref().filter(|value| !value.trim().is_empty());
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(None);
        };

        let start = parse_time_of_day(day, start)?;
        let end = parse_time_of_day(day, end)?;
        if start == end {
            return Ok(None);
        }

        Ok(Some(TimeSlot { start, end }))
    }
}

fn parse_time_of_day(day: DayOfWeek, value: &str) -> Result<NaiveTime, ScheduleError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| ScheduleError::InvalidTime {
            day,
            value: value.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }

    pub fn anchor(&self, date: NaiveDate, offset: &FixedOffset) -> Option<ActiveWindow> {
        let start = offset
            .from_local_datetime(&date.and_time(self.start))
            .single()?;
        let end_date = if self.crosses_midnight() {
            date.succ_opt()?
        } else {
            date
        };
        let end = offset
            .from_local_datetime(&end_date.and_time(self.end))
            .single()?;

        Some(ActiveWindow { start, end })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule {
    days: Vec<Vec<RawTimeSlot>>,
}

impl WeeklySchedule {
    pub fn new(days: Vec<Vec<RawTimeSlot>>) -> Self {
        Self { days }
    }

    pub fn raw_slots(&self, day: DayOfWeek) -> &[RawTimeSlot] {
        self.days
            .get(day.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn slots(&self, day: DayOfWeek) -> Result<Vec<TimeSlot>, ScheduleError> {
        let mut slots = Vec::new();
        for raw in self.raw_slots(day) {
            if let Some(slot) = raw.normalize(day)? {
                slots.push(slot);
            }
        }
        Ok(slots)
    }

    pub fn windows_on(
        &self,
        date: NaiveDate,
        offset: &FixedOffset,
    ) -> Result<Vec<ActiveWindow>, ScheduleError> {
        let day = DayOfWeek::from_chrono(date.weekday());
        Ok(self
            .slots(day)?
            .iter()
            .filter_map(|slot| slot.anchor(date, offset))
            .collect())
    }

    pub fn first_window_on(
        &self,
        date: NaiveDate,
        offset: &FixedOffset,
    ) -> Result<Option<ActiveWindow>, ScheduleError> {
        Ok(self
            .windows_on(date, offset)?
            .into_iter()
            .min_by_key(|window| window.start))
    }

    /// Yesterday's slots that run past midnight, today's windows in device
    /// order, then tomorrow's first window.
    pub fn windows_around(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<ActiveWindow>, ScheduleError> {
        let today = now.date_naive();
        let offset = *now.offset();

        let mut windows = Vec::new();
        if let Some(yesterday) = today.pred_opt() {
            windows.extend(
                self.windows_on(yesterday, &offset)?
                    .into_iter()
                    .filter(|window| window.end.date_naive() == today),
            );
        }
        windows.extend(self.windows_on(today, &offset)?);
        if let Some(tomorrow) = today.succ_opt() {
            if let Some(first) = self.first_window_on(tomorrow, &offset)? {
                windows.push(first);
            }
        }
        Ok(windows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ActiveWindow {
    /// Half-open: `start <= now < end`.
    pub fn contains(&self, now: DateTime<FixedOffset>) -> bool {
        self.start <= now && now < self.end
    }
}

impl fmt::Display for ActiveWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%a %Y-%m-%d %H:%M:%S"),
            self.end.format("%a %Y-%m-%d %H:%M:%S")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Active(ActiveWindow),
    Idle { next_start: DateTime<FixedOffset> },
}

pub fn resolve(
    now: DateTime<FixedOffset>,
    windows: &[ActiveWindow],
) -> Result<Resolution, ScheduleError> {
    // Overlapping slots: keep calibrating for as long as any of them runs.
    if let Some(active) = windows
        .iter()
        .filter(|window| window.contains(now))
        .max_by_key(|window| window.end)
    {
        return Ok(Resolution::Active(*active));
    }

    windows
        .iter()
        .map(|window| window.start)
        .filter(|start| *start > now)
        .min()
        .map(|next_start| Resolution::Idle { next_start })
        .ok_or(ScheduleError::Exhausted { now })
}

pub fn wait_until(now: DateTime<FixedOffset>, at: DateTime<FixedOffset>) -> std::time::Duration {
    (at - now).to_std().unwrap_or_default()
}
