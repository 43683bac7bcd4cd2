//! # trackr common library
//!
//! Shared code for the library attendance kiosk:
//! - Configuration loading and root folder resolution
//! - School calendar helpers (timezone, week window, period table)
//! - Roster spreadsheet store and its in-memory cache
//! - Database initialization and record stores
//! - CSV backup of accepted attendance

pub mod config;
pub mod csv_backup;
pub mod db;
pub mod error;
pub mod period;
pub mod roster;
pub mod time;

pub use error::{Error, Result};
pub use period::{CurrentPeriod, PeriodTable};
pub use roster::{RosterCache, RosterEntry, RosterStore};
pub use time::{Clock, SchoolCalendar, SystemClock};
