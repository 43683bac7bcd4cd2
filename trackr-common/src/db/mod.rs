//! Database initialization and record stores
//!
//! Each store is a set of free functions over a `SqlitePool`. Ids are UUIDs
//! stored as TEXT; instants are RFC 3339 UTC strings with a fixed width so
//! that text ordering matches time ordering.

pub mod attendance;
pub mod init;
pub mod memos;
pub mod roster_backup;
pub mod warnings;

pub use attendance::*;
pub use init::*;
pub use memos::*;
pub use roster_backup::*;
pub use warnings::*;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

/// Format an instant for storage
pub(crate) fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt timestamp '{}': {}", value, e)))
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Corrupt id '{}': {}", value, e)))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_instant_text_roundtrip_and_order() {
        let early = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        let (a, b) = (format_instant(early), format_instant(late));
        assert!(a < b);
        assert_eq!(parse_instant(&a).unwrap(), early);
        assert!(parse_instant("yesterday").is_err());
    }
}
