//! In-memory filtering, grouping and statistics over attendance records

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use trackr_common::db::AttendanceRecord;
use trackr_common::period::period_label;
use trackr_common::PeriodTable;

/// Query string shared by the list view and the exports
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub date: Option<String>,
    pub period: Option<String>,
    pub student_id: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
}

impl ListQuery {
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            date: non_blank(&self.date),
            period: non_blank(&self.period),
            student_id: non_blank(&self.student_id),
        }
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey::parse(self.sort.as_deref())
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::parse(self.order.as_deref())
    }

    /// Query string without the page number, for pagination and export links
    pub fn to_query_string(&self) -> String {
        let filter = self.filter();
        let mut pairs = Vec::new();
        if let Some(date) = &filter.date {
            pairs.push(format!("date={}", utf8_percent_encode(date, QUERY_VALUE)));
        }
        if let Some(period) = &filter.period {
            pairs.push(format!("period={}", utf8_percent_encode(period, QUERY_VALUE)));
        }
        if let Some(student_id) = &filter.student_id {
            pairs.push(format!("student_id={}", utf8_percent_encode(student_id, QUERY_VALUE)));
        }
        pairs.push(format!("sort={}", self.sort_key().as_str()));
        pairs.push(format!("order={}", self.sort_order().as_str()));
        pairs.join("&")
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Bytes escaped in query values; unreserved `-_.~` pass through
pub const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Equality filters; `None` matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub date: Option<String>,
    pub period: Option<String>,
    pub student_id: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.date.as_deref().map_or(true, |d| record.date_only == d)
            && self.period.as_deref().map_or(true, |p| record.period == p)
            && self
                .student_id
                .as_deref()
                .map_or(true, |s| record.student_id == s)
    }

    pub fn apply(&self, records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    StudentId,
    Name,
    Seat,
    Period,
}

impl SortKey {
    /// Unknown keys fall back to date
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("student_id") => SortKey::StudentId,
            Some("name") => SortKey::Name,
            Some("seat") => SortKey::Seat,
            Some("period") => SortKey::Period,
            _ => SortKey::Date,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::StudentId => "student_id",
            SortKey::Name => "name",
            SortKey::Seat => "seat",
            SortKey::Period => "period",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Ordering key for period labels: numbered periods first, by number
pub fn period_rank(label: &str) -> (u8, String) {
    let number = label
        .strip_prefix("Period ")
        .and_then(|n| n.trim().parse::<u8>().ok());
    match number {
        Some(n) => (n, String::new()),
        None => (u8::MAX, label.to_string()),
    }
}

/// Numbers compare numerically, anything else as text
fn compare_seat(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Stable sort; ties keep newest-first load order
pub fn sort_records(records: &mut [AttendanceRecord], key: SortKey, order: SortOrder) {
    records.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Date => a.recorded_at.cmp(&b.recorded_at),
            SortKey::StudentId => a.student_id.cmp(&b.student_id),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Seat => compare_seat(&a.seat, &b.seat),
            SortKey::Period => period_rank(&a.period).cmp(&period_rank(&b.period)),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Records grouped by date (newest first), then by period
pub type DatePeriodGroups = Vec<(String, Vec<(String, Vec<AttendanceRecord>)>)>;

pub fn group_by_date_and_period(records: &[AttendanceRecord]) -> DatePeriodGroups {
    let mut by_date: BTreeMap<String, BTreeMap<(u8, String), (String, Vec<AttendanceRecord>)>> =
        BTreeMap::new();
    for record in records {
        by_date
            .entry(record.date_only.clone())
            .or_default()
            .entry(period_rank(&record.period))
            .or_insert_with(|| (record.period.clone(), Vec::new()))
            .1
            .push(record.clone());
    }

    by_date
        .into_iter()
        .rev()
        .map(|(date, periods)| {
            let periods = periods
                .into_values()
                .map(|(label, mut rows)| {
                    rows.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
                    (label, rows)
                })
                .collect();
            (date, periods)
        })
        .collect()
}

/// Today's load of one period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodLoad {
    pub label: String,
    pub count: usize,
    pub capacity: i64,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopStudent {
    pub student_id: String,
    pub name: String,
    pub visits: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub unique_students: usize,
    /// `(period label, count)` in period order
    pub per_period: Vec<(String, usize)>,
    /// `(date, count)` newest first
    pub per_date: Vec<(String, usize)>,
    pub top_students: Vec<TopStudent>,
    pub today: Vec<PeriodLoad>,
}

/// Number of entries in the top students table
pub const TOP_STUDENTS: usize = 10;

pub fn compute_stats(
    records: &[AttendanceRecord],
    today: &str,
    periods: &PeriodTable,
    capacity: i64,
) -> Stats {
    let mut per_period: BTreeMap<(u8, String), (String, usize)> = BTreeMap::new();
    let mut per_date: BTreeMap<String, usize> = BTreeMap::new();
    let mut per_student: HashMap<&str, (&str, usize)> = HashMap::new();

    for record in records {
        per_period
            .entry(period_rank(&record.period))
            .or_insert_with(|| (record.period.clone(), 0))
            .1 += 1;
        *per_date.entry(record.date_only.clone()).or_default() += 1;
        per_student
            .entry(record.student_id.as_str())
            .or_insert((record.name.as_str(), 0))
            .1 += 1;
    }

    let mut top_students: Vec<TopStudent> = per_student
        .iter()
        .map(|(id, (name, visits))| TopStudent {
            student_id: id.to_string(),
            name: name.to_string(),
            visits: *visits,
        })
        .collect();
    top_students.sort_by(|a, b| {
        b.visits
            .cmp(&a.visits)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    top_students.truncate(TOP_STUDENTS);

    let today_loads = periods
        .periods()
        .into_iter()
        .map(|n| {
            let label = period_label(n);
            let count = records
                .iter()
                .filter(|r| r.date_only == today && r.period == label)
                .count();
            PeriodLoad {
                label,
                count,
                capacity,
                closed: periods.is_disabled(n),
            }
        })
        .collect();

    Stats {
        total: records.len(),
        unique_students: per_student.len(),
        per_period: per_period.into_values().collect(),
        per_date: per_date.into_iter().rev().collect(),
        top_students,
        today: today_loads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use trackr_common::{RosterEntry, SchoolCalendar};

    fn record(id: &str, name: &str, seat: &str, period: &str, day: u32, hour: u32) -> AttendanceRecord {
        let cal = SchoolCalendar::default();
        let at: DateTime<Utc> = cal
            .offset()
            .with_ymd_and_hms(2026, 10, day, hour, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        AttendanceRecord::new(&RosterEntry::new(id, name, seat), period, at, &cal)
    }

    fn sample() -> Vec<AttendanceRecord> {
        vec![
            record("3", "Choi", "10", "Period 10", 21, 9),
            record("1", "Kim", "9", "Period 2", 20, 10),
            record("2", "Lee", "A1", "Period 1", 20, 8),
            record("1", "Kim", "9", "Out of hours", 19, 18),
        ]
    }

    #[test]
    fn test_filter_ignores_blank_fields() {
        let query = ListQuery {
            date: Some("2026-10-20".to_string()),
            period: Some("  ".to_string()),
            ..ListQuery::default()
        };
        let filtered = query.filter().apply(sample());
        assert_eq!(filtered.len(), 2);

        let by_student = RecordFilter {
            student_id: Some("1".to_string()),
            ..RecordFilter::default()
        };
        assert_eq!(by_student.apply(sample()).len(), 2);
    }

    #[test]
    fn test_sort_by_period_uses_number() {
        let mut records = sample();
        sort_records(&mut records, SortKey::Period, SortOrder::Asc);
        let periods: Vec<&str> = records.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(periods, vec!["Period 1", "Period 2", "Period 10", "Out of hours"]);
    }

    #[test]
    fn test_sort_by_seat_numeric_then_text() {
        let mut records = sample();
        sort_records(&mut records, SortKey::Seat, SortOrder::Asc);
        let seats: Vec<&str> = records.iter().map(|r| r.seat.as_str()).collect();
        assert_eq!(seats, vec!["9", "9", "10", "A1"]);
    }

    #[test]
    fn test_sort_by_date_desc_default() {
        let query = ListQuery::default();
        let mut records = sample();
        sort_records(&mut records, query.sort_key(), query.sort_order());
        assert_eq!(records[0].date_only, "2026-10-21");
        assert_eq!(records[3].date_only, "2026-10-19");
    }

    #[test]
    fn test_unknown_sort_falls_back() {
        assert_eq!(SortKey::parse(Some("bogus")), SortKey::Date);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Desc);
        assert_eq!(SortOrder::Asc.toggled(), SortOrder::Desc);
    }

    #[test]
    fn test_grouping() {
        let groups = group_by_date_and_period(&sample());
        let dates: Vec<&str> = groups.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(dates, vec!["2026-10-21", "2026-10-20", "2026-10-19"]);
        let periods: Vec<&str> = groups[1].1.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(periods, vec!["Period 1", "Period 2"]);
    }

    #[test]
    fn test_stats() {
        let mut records = sample();
        records.push(record("4", "Jung", "11", "Period 2", 20, 10));
        let stats = compute_stats(&records, "2026-10-20", &PeriodTable::default(), 30);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.unique_students, 4);
        assert_eq!(stats.per_date[0], ("2026-10-21".to_string(), 1));
        assert_eq!(stats.per_period[1], ("Period 2".to_string(), 2));
        assert_eq!(stats.top_students[0].student_id, "1");
        assert_eq!(stats.top_students[0].visits, 2);

        let p2 = stats.today.iter().find(|l| l.label == "Period 2").unwrap();
        assert_eq!(p2.count, 2);
        assert!(stats.today.iter().find(|l| l.label == "Period 4").unwrap().closed);
    }

    #[test]
    fn test_query_string_encodes_values() {
        let query = ListQuery {
            period: Some("Period 3".to_string()),
            sort: Some("name".to_string()),
            order: Some("asc".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(query.to_query_string(), "period=Period%203&sort=name&order=asc");
    }

    #[test]
    fn test_query_string_keeps_unreserved_and_escapes_utf8() {
        let query = ListQuery {
            date: Some("2026-10-19".to_string()),
            student_id: Some("김 1&2".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(
            query.to_query_string(),
            "date=2026-10-19&student_id=%EA%B9%80%201%262&sort=date&order=desc"
        );
    }
}
