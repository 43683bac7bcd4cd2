//! Append-only CSV copy of accepted attendance records
//!
//! Kept next to the database so that a corrupted or deleted database can be
//! reconstructed by hand.

use std::fs::OpenOptions;
use std::path::Path;

use crate::db::AttendanceRecord;
use crate::Result;

const HEADER: [&str; 6] = ["id", "student_id", "name", "seat", "period", "display_time"];

/// Append one record, writing the header first when the file is new or empty
pub fn append_attendance_backup(path: &Path, record: &AttendanceRecord) -> Result<()> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if needs_header {
        writer.write_record(HEADER)?;
    }
    writer.write_record([
        record.id.to_string().as_str(),
        record.student_id.as_str(),
        record.name.as_str(),
        record.seat.as_str(),
        record.period.as_str(),
        record.display_time.as_str(),
    ])?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::RosterEntry;
    use crate::time::SchoolCalendar;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance_backup.csv");
        let cal = SchoolCalendar::default();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 30, 0).unwrap();

        for id in ["1", "2"] {
            let record = AttendanceRecord::new(&RosterEntry::new(id, "Kim, Jr", "7"), "Period 1", now, &cal);
            append_attendance_backup(&path, &record).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "id,student_id,name,seat,period,display_time");
        assert!(lines[1].contains(",1,\"Kim, Jr\",7,Period 1,2026-10-19 09:30:00"));
    }
}
