use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let local = Utc::now().with_timezone(&self.timezone);
        local.with_timezone(&local.offset().fix())
    }
}

/// Sleeps for `duration` unless `cancel` fires first. Returns `false` when
/// cancelled.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

#[cfg(test)]
pub struct PausedClock {
    origin: DateTime<FixedOffset>,
    started: tokio::time::Instant,
}

#[cfg(test)]
impl PausedClock {
    pub fn starting_at(origin: DateTime<FixedOffset>) -> Self {
        Self {
            origin,
            started: tokio::time::Instant::now(),
        }
    }
}

#[cfg(test)]
impl Clock for PausedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.origin + chrono::Duration::from_std(self.started.elapsed()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixed_time;

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_cancellation() {
        let cancel = CancellationToken::new();
        let clock = PausedClock::starting_at(fixed_time(5, 12, 0, 0));

        assert!(sleep_or_cancel(Duration::from_secs(90), &cancel).await);
        assert_eq!(clock.now().timestamp(), fixed_time(5, 12, 1, 30).timestamp());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_sleep() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!sleep_or_cancel(Duration::from_secs(3_600), &cancel).await);
    }

    #[test]
    fn system_clock_reports_zone_offset() {
        let clock = SystemClock::new(chrono_tz::Asia::Kolkata);

        assert_eq!(clock.now().offset().local_minus_utc(), 5 * 3_600 + 30 * 60);
    }
}
