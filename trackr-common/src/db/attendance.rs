//! Attendance record persistence

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{format_instant, parse_instant, parse_uuid};
use crate::roster::RosterEntry;
use crate::time::SchoolCalendar;
use crate::Result;

/// One accepted kiosk submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: String,
    pub name: String,
    pub seat: String,
    /// Period label at submission time, e.g. `Period 3` or `Out of hours`
    pub period: String,
    pub recorded_at: DateTime<Utc>,
    /// `YYYY-MM-DD` in school local time
    pub date_only: String,
    /// `HH:MM:SS` in school local time
    pub time_only: String,
    pub display_time: String,
}

impl AttendanceRecord {
    /// Build a new record for a rostered student
    pub fn new(
        student: &RosterEntry,
        period: &str,
        recorded_at: DateTime<Utc>,
        calendar: &SchoolCalendar,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            seat: student.seat.clone(),
            period: period.to_string(),
            recorded_at,
            date_only: calendar.date_string(recorded_at),
            time_only: calendar.time_string(recorded_at),
            display_time: calendar.display_string(recorded_at),
        }
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        let recorded_at: String = row.try_get("recorded_at")?;
        Ok(Self {
            id: parse_uuid(&id)?,
            student_id: row.try_get("student_id")?,
            name: row.try_get("name")?,
            seat: row.try_get("seat")?,
            period: row.try_get("period")?,
            recorded_at: parse_instant(&recorded_at)?,
            date_only: row.try_get("date_only")?,
            time_only: row.try_get("time_only")?,
            display_time: row.try_get("display_time")?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, student_id, name, seat, period, recorded_at, \
                              date_only, time_only, display_time FROM attendances";

/// Insert a record
pub async fn save_attendance(pool: &SqlitePool, record: &AttendanceRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendances (
            id, student_id, name, seat, period, recorded_at,
            date_only, time_only, display_time
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.student_id)
    .bind(&record.name)
    .bind(&record.seat)
    .bind(&record.period)
    .bind(format_instant(record.recorded_at))
    .bind(&record.date_only)
    .bind(&record.time_only)
    .bind(&record.display_time)
    .execute(pool)
    .await?;

    Ok(())
}

/// All records of one student, newest first
pub async fn load_attendance_for_student(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Vec<AttendanceRecord>> {
    let sql = format!("{} WHERE student_id = ? ORDER BY recorded_at DESC", SELECT_COLUMNS);
    let rows = sqlx::query(&sql).bind(student_id).fetch_all(pool).await?;
    rows.iter().map(AttendanceRecord::from_row).collect()
}

/// Most recent records, newest first, bounded by `limit`
pub async fn load_recent_attendance(pool: &SqlitePool, limit: i64) -> Result<Vec<AttendanceRecord>> {
    let sql = format!("{} ORDER BY recorded_at DESC LIMIT ?", SELECT_COLUMNS);
    let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;
    rows.iter().map(AttendanceRecord::from_row).collect()
}

/// Records of one local date, newest first
pub async fn load_attendance_for_date(
    pool: &SqlitePool,
    date_only: &str,
) -> Result<Vec<AttendanceRecord>> {
    let sql = format!("{} WHERE date_only = ? ORDER BY recorded_at DESC", SELECT_COLUMNS);
    let rows = sqlx::query(&sql).bind(date_only).fetch_all(pool).await?;
    rows.iter().map(AttendanceRecord::from_row).collect()
}

/// Number of records with a given period label on a local date
pub async fn count_attendance_in_period(
    pool: &SqlitePool,
    date_only: &str,
    period: &str,
) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendances WHERE date_only = ? AND period = ?")
            .bind(date_only)
            .bind(period)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn count_attendance(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendances")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Delete one record; false when it did not exist
pub async fn delete_attendance(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM attendances WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete several records in one transaction, returning how many existed
pub async fn delete_attendance_many(pool: &SqlitePool, ids: &[Uuid]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut deleted = 0;
    for id in ids {
        let result = sqlx::query("DELETE FROM attendances WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        deleted += result.rows_affected();
    }
    tx.commit().await?;
    Ok(deleted)
}

/// Delete every record recorded strictly before `cutoff`
pub async fn delete_attendance_before(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM attendances WHERE recorded_at < ?")
        .bind(format_instant(cutoff))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
