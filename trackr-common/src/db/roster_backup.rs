//! Roster snapshots kept in the database
//!
//! The spreadsheet is edited by hand and occasionally lost. At startup the
//! kiosk snapshots a present roster, or restores the latest snapshot when the
//! file is missing.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use super::{format_instant, parse_instant, parse_uuid};
use crate::roster::{RosterEntry, RosterStore};
use crate::{Error, Result};

/// Number of snapshots retained
pub const ROSTER_BACKUPS_KEPT: i64 = 10;

#[derive(Debug, Clone)]
pub struct RosterBackup {
    pub id: Uuid,
    pub backed_up_at: DateTime<Utc>,
    pub student_count: i64,
    pub entries: Vec<RosterEntry>,
}

/// Store a snapshot and prune old ones
pub async fn save_roster_backup(
    pool: &SqlitePool,
    entries: &[RosterEntry],
    now: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let rows_json = serde_json::to_string(entries)
        .map_err(|e| Error::Internal(format!("Failed to encode roster backup: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO roster_backups (id, backed_up_at, student_count, rows_json)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(format_instant(now))
    .bind(entries.len() as i64)
    .bind(rows_json)
    .execute(pool)
    .await?;

    let pruned = sqlx::query(
        r#"
        DELETE FROM roster_backups WHERE id NOT IN (
            SELECT id FROM roster_backups ORDER BY backed_up_at DESC LIMIT ?
        )
        "#,
    )
    .bind(ROSTER_BACKUPS_KEPT)
    .execute(pool)
    .await?;

    info!(
        "Backed up {} roster entries (pruned {} old snapshots)",
        entries.len(),
        pruned.rows_affected()
    );
    Ok(id)
}

/// Latest snapshot, if any
pub async fn load_latest_roster_backup(pool: &SqlitePool) -> Result<Option<RosterBackup>> {
    let row = sqlx::query(
        r#"
        SELECT id, backed_up_at, student_count, rows_json
        FROM roster_backups
        ORDER BY backed_up_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let id: String = row.try_get("id")?;
    let backed_up_at: String = row.try_get("backed_up_at")?;
    let rows_json: String = row.try_get("rows_json")?;
    let entries: Vec<RosterEntry> = serde_json::from_str(&rows_json)
        .map_err(|e| Error::Internal(format!("Corrupt roster backup {}: {}", id, e)))?;

    Ok(Some(RosterBackup {
        id: parse_uuid(&id)?,
        backed_up_at: parse_instant(&backed_up_at)?,
        student_count: row.try_get("student_count")?,
        entries,
    }))
}

/// What startup did with the roster spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterSync {
    /// Spreadsheet present; snapshot taken of this many rows
    BackedUp(usize),
    /// Spreadsheet missing; rewritten from the latest snapshot
    Restored(usize),
    /// Neither a spreadsheet nor a snapshot exists
    Missing,
}

/// Snapshot a present roster, or restore a missing one from the database
pub async fn sync_roster_backup(
    pool: &SqlitePool,
    store: &RosterStore,
    now: DateTime<Utc>,
) -> Result<RosterSync> {
    if store.exists() {
        let entries = store.load()?;
        save_roster_backup(pool, &entries, now).await?;
        return Ok(RosterSync::BackedUp(entries.len()));
    }

    match load_latest_roster_backup(pool).await? {
        Some(backup) => {
            store.save(&backup.entries)?;
            warn!(
                "Roster {} was missing; restored {} entries from backup taken {}",
                store.path().display(),
                backup.entries.len(),
                backup.backed_up_at
            );
            Ok(RosterSync::Restored(backup.entries.len()))
        }
        None => {
            warn!("No roster at {} and no backup to restore", store.path().display());
            Ok(RosterSync::Missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn test_latest_backup_wins() {
        let pool = test_pool().await;
        let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        assert!(load_latest_roster_backup(&pool).await.unwrap().is_none());

        save_roster_backup(&pool, &[RosterEntry::new("1", "A", "1")], t0)
            .await
            .unwrap();
        let newer = vec![RosterEntry::new("1", "A", "1"), RosterEntry::new("2", "B", "2")];
        let id = save_roster_backup(&pool, &newer, t0 + Duration::hours(1))
            .await
            .unwrap();

        let latest = load_latest_roster_backup(&pool).await.unwrap().unwrap();
        assert_eq!(latest.id, id);
        assert_eq!(latest.student_count, 2);
        assert_eq!(latest.entries, newer);
    }

    #[tokio::test]
    async fn test_old_backups_pruned() {
        let pool = test_pool().await;
        let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        for i in 0..(ROSTER_BACKUPS_KEPT + 3) {
            save_roster_backup(&pool, &[], t0 + Duration::minutes(i))
                .await
                .unwrap();
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roster_backups")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, ROSTER_BACKUPS_KEPT);
    }

    #[tokio::test]
    async fn test_sync_backs_up_then_restores() {
        let pool = test_pool().await;
        let dir = tempfile::TempDir::new().unwrap();
        let store = RosterStore::new(dir.path().join("students.csv"));
        let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();

        assert_eq!(sync_roster_backup(&pool, &store, t0).await.unwrap(), RosterSync::Missing);

        store.add_student(RosterEntry::new("1", "A", "1")).unwrap();
        assert_eq!(
            sync_roster_backup(&pool, &store, t0).await.unwrap(),
            RosterSync::BackedUp(1)
        );

        std::fs::remove_file(store.path()).unwrap();
        assert_eq!(
            sync_roster_backup(&pool, &store, t0 + Duration::hours(1)).await.unwrap(),
            RosterSync::Restored(1)
        );
        assert_eq!(store.load().unwrap(), vec![RosterEntry::new("1", "A", "1")]);
    }
}
