//! Usage warnings that temporarily block attendance

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{format_instant, parse_instant, parse_uuid};
use crate::{Error, Result};

/// Reason recorded when the admin leaves the field blank
pub const DEFAULT_WARNING_REASON: &str = "Library rules violation";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub id: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub reason: String,
    pub warning_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub is_active: bool,
}

impl Warning {
    /// New active warning lasting `days` from `now`
    ///
    /// Fails with `InvalidInput` when the expiry is not representable.
    pub fn new(
        student_id: &str,
        student_name: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
        days: i64,
    ) -> Result<Self> {
        let expiry_date = Duration::try_days(days)
            .and_then(|length| now.checked_add_signed(length))
            .ok_or_else(|| Error::InvalidInput(format!("Warning length of {} days is out of range", days)))?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_WARNING_REASON);
        Ok(Self {
            id: Uuid::new_v4(),
            student_id: student_id.trim().to_string(),
            student_name: student_name.to_string(),
            reason: reason.to_string(),
            warning_date: now,
            expiry_date,
            is_active: true,
        })
    }

    /// Active and not yet expired
    pub fn is_in_force(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expiry_date > now
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        let warning_date: String = row.try_get("warning_date")?;
        let expiry_date: String = row.try_get("expiry_date")?;
        Ok(Self {
            id: parse_uuid(&id)?,
            student_id: row.try_get("student_id")?,
            student_name: row.try_get("student_name")?,
            reason: row.try_get("reason")?,
            warning_date: parse_instant(&warning_date)?,
            expiry_date: parse_instant(&expiry_date)?,
            is_active: row.try_get("is_active")?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, student_id, student_name, reason, warning_date, \
                              expiry_date, is_active FROM warnings";

pub async fn save_warning(pool: &SqlitePool, warning: &Warning) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO warnings (
            id, student_id, student_name, reason, warning_date, expiry_date, is_active
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(warning.id.to_string())
    .bind(&warning.student_id)
    .bind(&warning.student_name)
    .bind(&warning.reason)
    .bind(format_instant(warning.warning_date))
    .bind(format_instant(warning.expiry_date))
    .bind(warning.is_active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Every warning ever issued to a student, in any state
pub async fn load_warnings_for_student(pool: &SqlitePool, student_id: &str) -> Result<Vec<Warning>> {
    let sql = format!("{} WHERE student_id = ? ORDER BY warning_date DESC", SELECT_COLUMNS);
    let rows = sqlx::query(&sql).bind(student_id).fetch_all(pool).await?;
    rows.iter().map(Warning::from_row).collect()
}

/// All warnings, newest first
pub async fn load_all_warnings(pool: &SqlitePool) -> Result<Vec<Warning>> {
    let sql = format!("{} ORDER BY warning_date DESC", SELECT_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(Warning::from_row).collect()
}

/// Clear the active flag; false when the warning does not exist
pub async fn deactivate_warning(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE warnings SET is_active = 0 WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_warning(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM warnings WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_all_warnings(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM warnings").execute(pool).await?;
    Ok(result.rows_affected())
}
