//! Free-text memos attached to a (date, period) slot

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{format_instant, parse_instant};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodMemo {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Period label
    pub period: String,
    pub memo_text: String,
    pub updated_at: DateTime<Utc>,
}

impl PeriodMemo {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        let updated_at: String = row.try_get("updated_at")?;
        Ok(Self {
            date: row.try_get("date")?,
            period: row.try_get("period")?,
            memo_text: row.try_get("memo_text")?,
            updated_at: parse_instant(&updated_at)?,
        })
    }
}

/// Create or overwrite the memo for a slot
pub async fn save_memo(pool: &SqlitePool, memo: &PeriodMemo) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO period_memos (date, period, memo_text, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(date, period) DO UPDATE SET
            memo_text = excluded.memo_text,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&memo.date)
    .bind(&memo.period)
    .bind(&memo.memo_text)
    .bind(format_instant(memo.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_memo(pool: &SqlitePool, date: &str, period: &str) -> Result<Option<PeriodMemo>> {
    let row = sqlx::query(
        "SELECT date, period, memo_text, updated_at FROM period_memos WHERE date = ? AND period = ?",
    )
    .bind(date)
    .bind(period)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(PeriodMemo::from_row).transpose()
}

/// Memos of one date ordered by period label
pub async fn load_memos_for_date(pool: &SqlitePool, date: &str) -> Result<Vec<PeriodMemo>> {
    let rows = sqlx::query(
        "SELECT date, period, memo_text, updated_at FROM period_memos WHERE date = ? ORDER BY period",
    )
    .bind(date)
    .fetch_all(pool)
    .await?;
    rows.iter().map(PeriodMemo::from_row).collect()
}

/// Most recently edited memos first
pub async fn load_recent_memos(pool: &SqlitePool, limit: i64) -> Result<Vec<PeriodMemo>> {
    let rows = sqlx::query(
        "SELECT date, period, memo_text, updated_at FROM period_memos \
         ORDER BY date DESC, period LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(PeriodMemo::from_row).collect()
}
