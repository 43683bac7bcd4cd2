//! Student roster spreadsheet and its in-memory cache
//!
//! The roster (student id -> name, seat) lives in a spreadsheet that the
//! librarians also edit by hand, either an Excel workbook (`.xlsx`, `.xls`,
//! `.ods`) or a CSV file. The kiosk loads it wholesale into memory and
//! reloads after a TTL or after any edit made through the admin endpoints.

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::{Error, Result};

/// One roster row
///
/// Both English headers and the school's Korean headers are accepted when
/// reading. Files are always written back with English headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(alias = "학번")]
    pub student_id: String,
    #[serde(alias = "이름")]
    pub name: String,
    #[serde(default, alias = "좌석번호", alias = "공강좌석번호")]
    pub seat: String,
}

impl RosterEntry {
    pub fn new(student_id: &str, name: &str, seat: &str) -> Self {
        Self {
            student_id: student_id.trim().to_string(),
            name: name.trim().to_string(),
            seat: seat.trim().to_string(),
        }
    }

    fn normalized(self) -> Option<Self> {
        let entry = Self::new(&self.student_id, &self.name, &self.seat);
        (!entry.student_id.is_empty() && !entry.name.is_empty()).then_some(entry)
    }
}

/// Result of adding a student
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyExists,
}

/// Result of an update-or-insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Updated,
    Inserted,
}

/// One item of a bulk seat/name update
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeatChange {
    pub student_id: String,
    #[serde(default)]
    pub new_seat: Option<String>,
    #[serde(default)]
    pub new_name: Option<String>,
}

/// Counts reported after a bulk update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkUpdateSummary {
    pub seats_changed: usize,
    pub names_changed: usize,
    pub not_found: usize,
}

/// On-disk layout of the roster, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    Csv,
    Workbook,
}

impl RosterFormat {
    /// `.xlsx`, `.xlsm`, `.xls` and `.ods` are workbooks; anything else is CSV
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xls" | "ods") => RosterFormat::Workbook,
            _ => RosterFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RosterColumn {
    StudentId,
    Name,
    Seat,
}

impl RosterColumn {
    fn from_header(header: &str) -> Option<Self> {
        match header.trim() {
            "student_id" | "학번" => Some(RosterColumn::StudentId),
            "name" | "이름" => Some(RosterColumn::Name),
            "seat" | "좌석번호" | "공강좌석번호" => Some(RosterColumn::Seat),
            _ => None,
        }
    }
}

const HEADERS: [&str; 3] = ["student_id", "name", "seat"];

/// Cell text as a librarian would read it; whole numbers lose the `.0`
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn workbook_error(err: impl std::fmt::Display) -> Error {
    Error::Workbook(err.to_string())
}

/// File-backed roster spreadsheet
#[derive(Debug)]
pub struct RosterStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RosterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn format(&self) -> RosterFormat {
        RosterFormat::from_path(&self.path)
    }

    /// Read every valid row
    ///
    /// Rows with an empty id or name, or that fail to parse, are skipped.
    pub fn load(&self) -> Result<Vec<RosterEntry>> {
        match self.format() {
            RosterFormat::Csv => self.load_csv(),
            RosterFormat::Workbook => self.load_workbook(),
        }
    }

    fn load_csv(&self) -> Result<Vec<RosterEntry>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut entries = Vec::new();
        for (index, row) in reader.deserialize::<RosterEntry>().enumerate() {
            match row {
                Ok(entry) => {
                    if let Some(entry) = entry.normalized() {
                        entries.push(entry);
                    }
                }
                Err(e) => warn!("Skipping roster row {}: {}", index + 2, e),
            }
        }
        Ok(entries)
    }

    /// First worksheet; the first row holds the headers
    fn load_workbook(&self) -> Result<Vec<RosterEntry>> {
        let mut workbook = open_workbook_auto(&self.path).map_err(workbook_error)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::Workbook(format!("{} has no sheets", self.path.display())))?
            .map_err(workbook_error)?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };
        let mut columns: HashMap<RosterColumn, usize> = HashMap::new();
        for (index, cell) in header_row.iter().enumerate() {
            if let Some(column) = RosterColumn::from_header(&cell_text(cell)) {
                columns.entry(column).or_insert(index);
            }
        }
        let (Some(&id_col), Some(&name_col)) = (
            columns.get(&RosterColumn::StudentId),
            columns.get(&RosterColumn::Name),
        ) else {
            return Err(Error::Workbook(format!(
                "{} needs student_id (학번) and name (이름) columns",
                self.path.display()
            )));
        };
        let seat_col = columns.get(&RosterColumn::Seat).copied();

        let cell = |row: &[Data], index: usize| row.get(index).map(cell_text).unwrap_or_default();
        let entries = rows
            .filter_map(|row| {
                let seat = seat_col.map(|i| cell(row, i)).unwrap_or_default();
                RosterEntry::new(&cell(row, id_col), &cell(row, name_col), &seat).normalized()
            })
            .collect();
        Ok(entries)
    }

    fn load_or_empty(&self) -> Result<Vec<RosterEntry>> {
        if self.exists() {
            self.load()
        } else {
            Ok(Vec::new())
        }
    }

    /// Replace the spreadsheet contents
    ///
    /// Writes to a sibling temp file first and renames it over the original.
    pub fn save(&self, entries: &[RosterEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("csv");
        let tmp_path = self.path.with_extension(format!("{}.tmp", extension));
        match self.format() {
            RosterFormat::Csv => write_csv(&tmp_path, entries)?,
            RosterFormat::Workbook => write_workbook(&tmp_path, entries).map_err(workbook_error)?,
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Append a student; an existing id is left untouched
    pub fn add_student(&self, entry: RosterEntry) -> Result<AddOutcome> {
        let entry = entry
            .normalized()
            .ok_or_else(|| Error::InvalidInput("student id and name are required".to_string()))?;

        let _guard = self.lock();
        let mut entries = self.load_or_empty()?;
        if entries.iter().any(|e| e.student_id == entry.student_id) {
            return Ok(AddOutcome::AlreadyExists);
        }
        entries.push(entry);
        self.save(&entries)?;
        Ok(AddOutcome::Added)
    }

    /// Update seat and/or name of an existing student, or append a new row
    pub fn upsert_student(
        &self,
        student_id: &str,
        seat: Option<&str>,
        name: Option<&str>,
    ) -> Result<UpsertOutcome> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(Error::InvalidInput("student id is required".to_string()));
        }

        let _guard = self.lock();
        let mut entries = self.load_or_empty()?;
        let outcome = match entries.iter_mut().find(|e| e.student_id == student_id) {
            Some(existing) => {
                if let Some(seat) = non_blank(seat) {
                    existing.seat = seat.to_string();
                }
                if let Some(name) = non_blank(name) {
                    existing.name = name.to_string();
                }
                UpsertOutcome::Updated
            }
            None => {
                let name = non_blank(name).ok_or_else(|| {
                    Error::InvalidInput(format!("name is required to add student {}", student_id))
                })?;
                entries.push(RosterEntry::new(student_id, name, seat.unwrap_or_default()));
                UpsertOutcome::Inserted
            }
        };
        self.save(&entries)?;
        Ok(outcome)
    }

    /// Change the seat of an existing student
    pub fn update_seat(&self, student_id: &str, seat: &str) -> Result<RosterEntry> {
        let student_id = student_id.trim();
        let _guard = self.lock();
        let mut entries = self.load_or_empty()?;
        let updated = {
            let entry = entries
                .iter_mut()
                .find(|e| e.student_id == student_id)
                .ok_or_else(|| Error::NotFound(format!("student {}", student_id)))?;
            entry.seat = seat.trim().to_string();
            entry.clone()
        };
        self.save(&entries)?;
        Ok(updated)
    }

    /// Apply several seat/name changes in one write
    pub fn bulk_update(&self, changes: &[SeatChange]) -> Result<BulkUpdateSummary> {
        let _guard = self.lock();
        let mut entries = self.load_or_empty()?;
        let mut summary = BulkUpdateSummary::default();

        for change in changes {
            let id = change.student_id.trim();
            let Some(entry) = entries.iter_mut().find(|e| e.student_id == id) else {
                summary.not_found += 1;
                continue;
            };
            if let Some(seat) = non_blank(change.new_seat.as_deref()) {
                entry.seat = seat.to_string();
                summary.seats_changed += 1;
            }
            if let Some(name) = non_blank(change.new_name.as_deref()) {
                entry.name = name.to_string();
                summary.names_changed += 1;
            }
        }

        self.save(&entries)?;
        Ok(summary)
    }

    /// Remove a student row
    pub fn delete_student(&self, student_id: &str) -> Result<RosterEntry> {
        let student_id = student_id.trim();
        let _guard = self.lock();
        let mut entries = self.load_or_empty()?;
        let index = entries
            .iter()
            .position(|e| e.student_id == student_id)
            .ok_or_else(|| Error::NotFound(format!("student {}", student_id)))?;
        let removed = entries.remove(index);
        self.save(&entries)?;
        Ok(removed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn write_csv(path: &Path, entries: &[RosterEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if entries.is_empty() {
        writer.write_record(HEADERS)?;
    }
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

/// Ids are written as text so leading zeros survive
fn write_workbook(path: &Path, entries: &[RosterEntry]) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (col, title) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    for (index, entry) in entries.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, &entry.student_id)?;
        worksheet.write_string(row, 1, &entry.name)?;
        worksheet.write_string(row, 2, &entry.seat)?;
    }

    workbook.save(path)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Immutable roster snapshot keyed by student id
pub type RosterMap = HashMap<String, RosterEntry>;

struct CachedRoster {
    entries: Arc<RosterMap>,
    /// `None` once invalidated; the entries stay as the reload fallback
    loaded_at: Option<Instant>,
}

/// Time-bounded cache over a [`RosterStore`]
pub struct RosterCache {
    store: RosterStore,
    ttl: Duration,
    state: RwLock<Option<CachedRoster>>,
}

impl RosterCache {
    pub fn new(store: RosterStore, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &RosterStore {
        &self.store
    }

    /// Current roster, reloading when the cache is empty or expired
    ///
    /// A failed reload keeps serving the previous snapshot. With no previous
    /// snapshot the roster is treated as empty.
    pub fn snapshot(&self) -> Arc<RosterMap> {
        if let Some(entries) = self.fresh() {
            return entries;
        }

        let started = Instant::now();
        match self.store.load() {
            Ok(rows) => {
                let map: RosterMap = rows
                    .into_iter()
                    .map(|e| (e.student_id.clone(), e))
                    .collect();
                let entries = Arc::new(map);
                info!(
                    "Loaded {} roster entries from {} in {} ms",
                    entries.len(),
                    self.store.path().display(),
                    started.elapsed().as_millis()
                );
                let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                *state = Some(CachedRoster {
                    entries: Arc::clone(&entries),
                    loaded_at: Some(Instant::now()),
                });
                entries
            }
            Err(e) => {
                let state = self.state.read().unwrap_or_else(|e| e.into_inner());
                match state.as_ref() {
                    Some(cached) => {
                        warn!("Roster reload failed, serving stale cache: {}", e);
                        Arc::clone(&cached.entries)
                    }
                    None => {
                        error!("Failed to load roster {}: {}", self.store.path().display(), e);
                        Arc::new(RosterMap::new())
                    }
                }
            }
        }
    }

    fn fresh(&self) -> Option<Arc<RosterMap>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .as_ref()
            .filter(|cached| {
                cached
                    .loaded_at
                    .is_some_and(|loaded_at| loaded_at.elapsed() < self.ttl)
            })
            .map(|cached| Arc::clone(&cached.entries))
    }

    /// Look up one student by (trimmed) id
    pub fn lookup(&self, student_id: &str) -> Option<RosterEntry> {
        self.snapshot().get(student_id.trim()).cloned()
    }

    /// Expire the cached snapshot so the next read reloads the file
    ///
    /// The old entries are kept for when that reload fails.
    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = state.as_mut() {
            cached.loaded_at = None;
        }
        debug!("Roster cache invalidated");
    }

    /// Roster rows sorted by student id
    pub fn sorted_entries(&self) -> Vec<RosterEntry> {
        let mut entries: Vec<RosterEntry> = self.snapshot().values().cloned().collect();
        entries.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        entries
    }

    pub fn add_student(&self, entry: RosterEntry) -> Result<AddOutcome> {
        let outcome = self.store.add_student(entry);
        self.invalidate();
        outcome
    }

    pub fn update_seat(&self, student_id: &str, seat: &str) -> Result<RosterEntry> {
        let updated = self.store.update_seat(student_id, seat);
        self.invalidate();
        updated
    }

    pub fn bulk_update(&self, changes: &[SeatChange]) -> Result<BulkUpdateSummary> {
        let summary = self.store.bulk_update(changes);
        self.invalidate();
        summary
    }

    pub fn delete_student(&self, student_id: &str) -> Result<RosterEntry> {
        let removed = self.store.delete_student(student_id);
        self.invalidate();
        removed
    }
}
