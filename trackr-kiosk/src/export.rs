//! Attendance exports for the librarians' spreadsheets

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use trackr_common::db::AttendanceRecord;
use trackr_common::{Error, Result};

const COLUMNS: [&str; 6] = ["Date", "Time", "Student ID", "Name", "Seat", "Period"];

/// Lets Excel detect UTF-8 so Korean names display correctly
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn row(record: &AttendanceRecord) -> [&str; 6] {
    [
        record.date_only.as_str(),
        record.time_only.as_str(),
        record.student_id.as_str(),
        record.name.as_str(),
        record.seat.as_str(),
        record.period.as_str(),
    ]
}

/// CSV with a UTF-8 byte order mark
pub fn to_csv(records: &[AttendanceRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.write_record(row(record))?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("Failed to finish CSV export: {}", e)))
}

/// Single-sheet workbook
pub fn to_xlsx(records: &[AttendanceRecord]) -> Result<Vec<u8>> {
    build_workbook(records).map_err(|e| Error::Internal(format!("Failed to build XLSX export: {}", e)))
}

fn build_workbook(records: &[AttendanceRecord]) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Attendance")?;

    for (col, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    for (index, record) in records.iter().enumerate() {
        let row_number = index as u32 + 1;
        for (col, value) in row(record).iter().enumerate() {
            worksheet.write_string(row_number, col as u16, *value)?;
        }
    }
    worksheet.set_column_width(0, 12)?;
    worksheet.set_column_width(3, 16)?;

    workbook.save_to_buffer()
}

/// `attendance_<stamp>.<ext>`
pub fn file_name(stamp: &str, extension: &str) -> String {
    format!("attendance_{}.{}", stamp, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use trackr_common::{RosterEntry, SchoolCalendar};

    fn records() -> Vec<AttendanceRecord> {
        let cal = SchoolCalendar::default();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 1, 0, 0).unwrap();
        vec![
            AttendanceRecord::new(&RosterEntry::new("10101", "김민지", "12"), "Period 2", at, &cal),
            AttendanceRecord::new(&RosterEntry::new("10102", "Lee, Jun", "13"), "Period 2", at, &cal),
        ]
    }

    #[test]
    fn test_csv_export() {
        let bytes = to_csv(&records()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Time,Student ID,Name,Seat,Period");
        assert_eq!(lines[1], "2026-10-19,10:00:00,10101,김민지,12,Period 2");
        assert_eq!(lines[2], "2026-10-19,10:00:00,10102,\"Lee, Jun\",13,Period 2");
    }

    #[test]
    fn test_xlsx_export_is_zip() {
        let bytes = to_xlsx(&records()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_empty_exports() {
        assert!(to_csv(&[]).unwrap().len() > UTF8_BOM.len());
        assert!(!to_xlsx(&[]).unwrap().is_empty());
    }
}
