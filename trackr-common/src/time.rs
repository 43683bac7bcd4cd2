//! Timestamp utilities and the school calendar
//!
//! All instants are stored as UTC. Day and week boundaries are computed in the
//! school's local time, which is a fixed UTC offset (Asia/Seoul by default,
//! no daylight saving).

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc,
};
use std::sync::Mutex;

use crate::{Error, Result};

/// Default school offset: UTC+09:00
pub const DEFAULT_OFFSET_MINUTES: i32 = 9 * 60;

/// Source of the current instant
///
/// Handlers never call `Utc::now()` directly so that the admission policy can
/// be exercised at any wall-clock time in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *guard = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Local-time view of instants for the school
#[derive(Debug, Clone, Copy)]
pub struct SchoolCalendar {
    offset: FixedOffset,
}

impl SchoolCalendar {
    /// Create a calendar for the given UTC offset in minutes
    pub fn new(offset_minutes: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!("Invalid timezone offset: {} minutes", offset_minutes))
        })?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Convert a UTC instant to school local time
    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Local calendar date of an instant
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date_naive()
    }

    /// Interpret a naive local date-time as school time
    pub fn localize(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        let utc = naive - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, self.offset)
    }

    /// UTC instant of local midnight at the start of `date`
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.localize(date.and_time(NaiveTime::default()))
            .with_timezone(&Utc)
    }

    /// Half-open `[start, end)` UTC window of the local day containing `instant`
    pub fn day_window(&self, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start_of_day(self.date_of(instant));
        (start, start + Duration::days(1))
    }

    /// Half-open `[start, end)` UTC window of the local week containing `instant`
    ///
    /// Weeks start on Monday 00:00 local time.
    pub fn week_window(&self, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.date_of(instant);
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let start = self.start_of_day(monday);
        (start, start + Duration::days(7))
    }

    /// True when `candidate` falls in the same local week as `reference`
    pub fn in_same_week(&self, reference: DateTime<Utc>, candidate: DateTime<Utc>) -> bool {
        let (start, end) = self.week_window(reference);
        candidate >= start && candidate < end
    }

    /// `YYYY-MM-DD` in local time
    pub fn date_string(&self, instant: DateTime<Utc>) -> String {
        self.local(instant).format("%Y-%m-%d").to_string()
    }

    /// `HH:MM:SS` in local time
    pub fn time_string(&self, instant: DateTime<Utc>) -> String {
        self.local(instant).format("%H:%M:%S").to_string()
    }

    /// `YYYY-MM-DD HH:MM:SS` in local time
    pub fn display_string(&self, instant: DateTime<Utc>) -> String {
        self.local(instant).format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl Default for SchoolCalendar {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Parse a `YYYY-MM-DD` form value
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidInput(format!("Invalid date '{}': {}", value, e)))
}
