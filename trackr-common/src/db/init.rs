//! Database initialization
//!
//! Creates the SQLite file on first run and the tables the kiosk needs.
//! Every statement is idempotent so startup can run it unconditionally.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the reporting views read while a submission writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables on an already open pool
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_attendances_table(pool).await?;
    create_warnings_table(pool).await?;
    create_period_memos_table(pool).await?;
    create_roster_backups_table(pool).await?;
    Ok(())
}

async fn create_attendances_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendances (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            name TEXT NOT NULL,
            seat TEXT NOT NULL DEFAULT '',
            period TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            date_only TEXT NOT NULL,
            time_only TEXT NOT NULL,
            display_time TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendances_student ON attendances(student_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendances_recorded ON attendances(recorded_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_warnings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS warnings (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            reason TEXT NOT NULL,
            warning_date TEXT NOT NULL,
            expiry_date TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_warnings_student ON warnings(student_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_period_memos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS period_memos (
            date TEXT NOT NULL,
            period TEXT NOT NULL,
            memo_text TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (date, period)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_roster_backups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS roster_backups (
            id TEXT PRIMARY KEY,
            backed_up_at TEXT NOT NULL,
            student_count INTEGER NOT NULL,
            rows_json TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
