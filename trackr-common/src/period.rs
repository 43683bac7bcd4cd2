//! Period (class time slot) computation
//!
//! Periods are recomputed from the clock on every request; nothing here is
//! persisted. Windows are half-open `[start, end)` in school local time and
//! weekends are always out of hours.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Error, Result};

/// Label stored on records created outside any period window
pub const OUT_OF_HOURS_LABEL: &str = "Out of hours";

/// One row of the period table as written in `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub period: u8,
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`
    pub end: String,
}

impl PeriodWindow {
    fn new(period: u8, start: &str, end: &str) -> Self {
        Self {
            period,
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// Default check-in windows
pub fn default_windows() -> Vec<PeriodWindow> {
    vec![
        PeriodWindow::new(1, "08:00", "09:30"),
        PeriodWindow::new(2, "09:30", "10:30"),
        PeriodWindow::new(3, "10:30", "11:30"),
        PeriodWindow::new(4, "11:30", "12:30"),
        PeriodWindow::new(5, "12:30", "14:20"),
        PeriodWindow::new(6, "14:20", "15:20"),
        PeriodWindow::new(7, "15:20", "16:30"),
    ]
}

/// Period 4 is lunch duty; the library is closed
pub fn default_disabled_periods() -> Vec<u8> {
    vec![4]
}

/// Result of looking up the period for an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentPeriod {
    OutOfHours,
    /// A period during which the library does not accept visits
    Closed(u8),
    Open(u8),
}

impl CurrentPeriod {
    pub fn number(&self) -> Option<u8> {
        match self {
            CurrentPeriod::OutOfHours => None,
            CurrentPeriod::Closed(n) | CurrentPeriod::Open(n) => Some(*n),
        }
    }

    /// Label stored on attendance records
    pub fn label(&self) -> String {
        match self.number() {
            Some(n) => period_label(n),
            None => OUT_OF_HOURS_LABEL.to_string(),
        }
    }

    /// Label shown on the kiosk page
    pub fn display(&self) -> String {
        match self {
            CurrentPeriod::Closed(n) => format!("{} (library closed)", period_label(*n)),
            other => other.label(),
        }
    }
}

pub fn period_label(number: u8) -> String {
    format!("Period {}", number)
}

#[derive(Debug, Clone)]
struct Slot {
    period: u8,
    start: NaiveTime,
    end: NaiveTime,
}

/// Static table of `(start, end) -> period` plus the disabled set
#[derive(Debug, Clone)]
pub struct PeriodTable {
    slots: Vec<Slot>,
    disabled: BTreeSet<u8>,
}

impl PeriodTable {
    /// Build a table, validating times and rejecting overlapping windows
    pub fn new(windows: &[PeriodWindow], disabled: &[u8]) -> Result<Self> {
        let mut slots = windows
            .iter()
            .map(|w| {
                let start = parse_hhmm(&w.start)?;
                let end = parse_hhmm(&w.end)?;
                if end <= start {
                    return Err(Error::Config(format!(
                        "Period {} ends ({}) before it starts ({})",
                        w.period, w.end, w.start
                    )));
                }
                Ok(Slot {
                    period: w.period,
                    start,
                    end,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        slots.sort_by_key(|s| s.start);
        for pair in slots.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(Error::Config(format!(
                    "Period {} overlaps period {}",
                    pair[1].period, pair[0].period
                )));
            }
        }

        Ok(Self {
            slots,
            disabled: disabled.iter().copied().collect(),
        })
    }

    /// Period containing a local date-time
    pub fn period_at(&self, local: DateTime<FixedOffset>) -> CurrentPeriod {
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return CurrentPeriod::OutOfHours;
        }

        let time = local.time();
        match self
            .slots
            .iter()
            .find(|slot| time >= slot.start && time < slot.end)
        {
            Some(slot) if self.disabled.contains(&slot.period) => CurrentPeriod::Closed(slot.period),
            Some(slot) => CurrentPeriod::Open(slot.period),
            None => CurrentPeriod::OutOfHours,
        }
    }

    /// Period numbers in start-time order
    pub fn periods(&self) -> Vec<u8> {
        self.slots.iter().map(|s| s.period).collect()
    }

    pub fn is_disabled(&self, period: u8) -> bool {
        self.disabled.contains(&period)
    }

    /// `(period, "HH:MM-HH:MM")` pairs for display
    pub fn describe(&self) -> Vec<(u8, String)> {
        self.slots
            .iter()
            .map(|s| {
                (
                    s.period,
                    format!("{}-{}", s.start.format("%H:%M"), s.end.format("%H:%M")),
                )
            })
            .collect()
    }
}

impl Default for PeriodTable {
    fn default() -> Self {
        let slots = default_windows()
            .iter()
            .filter_map(|w| {
                Some(Slot {
                    period: w.period,
                    start: parse_hhmm(&w.start).ok()?,
                    end: parse_hhmm(&w.end).ok()?,
                })
            })
            .collect();
        Self {
            slots,
            disabled: default_disabled_periods().into_iter().collect(),
        }
    }
}

fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| Error::Config(format!("Invalid period time '{}': {}", value, e)))
}
