//! Weekly attendance admission policy
//!
//! A submission passes four checks in order and stops at the first failure:
//! identity, active warnings, the once-per-week limit and the current
//! period's status and capacity. The admin override skips the last two.
//!
//! Checks and insert are not one transaction. Two simultaneous submissions
//! for the same student can both be accepted.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::fmt;
use tracing::{info, warn};
use trackr_common::csv_backup::append_attendance_backup;
use trackr_common::db::{
    count_attendance_in_period, load_attendance_for_student, load_warnings_for_student,
    save_attendance, AttendanceRecord,
};
use trackr_common::{CurrentPeriod, RosterEntry, SchoolCalendar};

use crate::AppState;

/// Form input for one check-in
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub student_id: &'a str,
    /// Optional name typed by the student, checked against the roster
    pub name: Option<&'a str>,
    pub admin_override: bool,
}

impl<'a> Submission<'a> {
    pub fn kiosk(student_id: &'a str, name: Option<&'a str>) -> Self {
        Self {
            student_id,
            name,
            admin_override: false,
        }
    }

    pub fn admin(student_id: &'a str) -> Self {
        Self {
            student_id,
            name: None,
            admin_override: true,
        }
    }
}

/// Reason a submission was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingStudentId,
    UnknownStudent,
    NameMismatch,
    Warned { reason: String, expiry: String },
    AlreadyAttendedThisWeek,
    OutOfHours,
    LibraryClosed(u8),
    PeriodFull { period: String, capacity: i64 },
}

impl Rejection {
    /// User-facing message for the flash area
    pub fn message(&self) -> String {
        match self {
            Rejection::MissingStudentId => "Please enter your student ID.".to_string(),
            Rejection::UnknownStudent => {
                "This student ID is not on the library roster.".to_string()
            }
            Rejection::NameMismatch => {
                "The name does not match the roster entry for this student ID.".to_string()
            }
            Rejection::Warned { reason, expiry } => format!(
                "Library use is suspended until {} (reason: {}).",
                expiry, reason
            ),
            Rejection::AlreadyAttendedThisWeek => {
                "You have already used the library this week.".to_string()
            }
            Rejection::OutOfHours => {
                "Attendance is only accepted during class periods on weekdays.".to_string()
            }
            Rejection::LibraryClosed(period) => {
                format!("The library is closed during period {}.", period)
            }
            Rejection::PeriodFull { period, capacity } => {
                format!("{} is full ({} students).", period, capacity)
            }
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Admission failure: a policy rejection or a store problem
#[derive(Debug)]
pub enum AdmissionError {
    Rejected(Rejection),
    Store(trackr_common::Error),
}

impl From<Rejection> for AdmissionError {
    fn from(rejection: Rejection) -> Self {
        AdmissionError::Rejected(rejection)
    }
}

impl From<trackr_common::Error> for AdmissionError {
    fn from(error: trackr_common::Error) -> Self {
        AdmissionError::Store(error)
    }
}

/// Run the policy and record the visit on success
pub async fn admit(
    state: &AppState,
    submission: &Submission<'_>,
) -> Result<AttendanceRecord, AdmissionError> {
    let now = state.clock.now();
    let result = evaluate(state, submission, now).await;

    match &result {
        Ok(record) => info!(
            "Accepted {} ({}) for {}{}",
            record.student_id,
            record.name,
            record.period,
            if submission.admin_override { " [admin]" } else { "" }
        ),
        Err(AdmissionError::Rejected(rejection)) => info!(
            "Rejected submission for '{}': {:?}",
            submission.student_id.trim(),
            rejection
        ),
        Err(AdmissionError::Store(e)) => warn!(
            "Store failure while admitting '{}': {}",
            submission.student_id.trim(),
            e
        ),
    }

    result
}

async fn evaluate(
    state: &AppState,
    submission: &Submission<'_>,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, AdmissionError> {
    let student = check_identity(state, submission).await?;
    check_warnings(&state.db, &state.calendar, &student.student_id, now).await?;

    let current = state.periods.period_at(state.calendar.local(now));
    if !submission.admin_override {
        check_weekly_limit(&state.db, &state.calendar, &student.student_id, now).await?;
        check_period(state, current, now).await?;
    }

    let record = AttendanceRecord::new(&student, &current.label(), now, &state.calendar);
    save_attendance(&state.db, &record).await?;

    if let Some(path) = &state.backup_path {
        if let Err(e) = append_attendance_backup(path, &record) {
            warn!("Failed to append CSV backup {}: {}", path.display(), e);
        }
    }

    Ok(record)
}

async fn check_identity(
    state: &AppState,
    submission: &Submission<'_>,
) -> Result<RosterEntry, AdmissionError> {
    let student_id = submission.student_id.trim();
    if student_id.is_empty() {
        return Err(Rejection::MissingStudentId.into());
    }

    let student = state
        .lookup_student(student_id)
        .await?
        .ok_or(Rejection::UnknownStudent)?;

    if let Some(name) = submission.name.map(str::trim).filter(|n| !n.is_empty()) {
        if name != student.name {
            return Err(Rejection::NameMismatch.into());
        }
    }

    Ok(student)
}

async fn check_warnings(
    db: &SqlitePool,
    calendar: &SchoolCalendar,
    student_id: &str,
    now: DateTime<Utc>,
) -> Result<(), AdmissionError> {
    let warnings = load_warnings_for_student(db, student_id).await?;
    match warnings.into_iter().find(|w| w.is_in_force(now)) {
        Some(warning) => Err(Rejection::Warned {
            reason: warning.reason,
            expiry: calendar.display_string(warning.expiry_date),
        }
        .into()),
        None => Ok(()),
    }
}

async fn check_weekly_limit(
    db: &SqlitePool,
    calendar: &SchoolCalendar,
    student_id: &str,
    now: DateTime<Utc>,
) -> Result<(), AdmissionError> {
    let records = load_attendance_for_student(db, student_id).await?;
    if records
        .iter()
        .any(|r| calendar.in_same_week(now, r.recorded_at))
    {
        return Err(Rejection::AlreadyAttendedThisWeek.into());
    }
    Ok(())
}

async fn check_period(
    state: &AppState,
    current: CurrentPeriod,
    now: DateTime<Utc>,
) -> Result<(), AdmissionError> {
    match current {
        CurrentPeriod::OutOfHours => Err(Rejection::OutOfHours.into()),
        CurrentPeriod::Closed(n) => Err(Rejection::LibraryClosed(n).into()),
        CurrentPeriod::Open(_) => {
            let label = current.label();
            let today = state.calendar.date_string(now);
            let count = count_attendance_in_period(&state.db, &today, &label).await?;
            if count >= state.config.capacity {
                return Err(Rejection::PeriodFull {
                    period: label,
                    capacity: state.config.capacity,
                }
                .into());
            }
            Ok(())
        }
    }
}
