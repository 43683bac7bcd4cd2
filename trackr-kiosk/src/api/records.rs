//! Attendance record views, exports and deletion

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use trackr_common::db::{
    delete_attendance, delete_attendance_before, delete_attendance_many, load_attendance_for_date,
    load_recent_attendance, AttendanceRecord,
};
use trackr_common::period::{period_label, OUT_OF_HOURS_LABEL};
use trackr_common::time::parse_date;
use uuid::Uuid;

use super::kiosk::rejection_level;
use super::{flash_store_error, parse_path_id};
use crate::admission::{admit, AdmissionError, Submission};
use crate::export;
use crate::pages::{by_period_page, list_page, ListView};
use crate::pagination::{calculate_pagination, parse_page};
use crate::reporting::{compute_stats, group_by_date_and_period, sort_records, ListQuery};
use crate::session::{FlashLevel, Session};
use crate::AppState;

/// Newest records up to the configured row limit; empty when the store fails
async fn load_records(state: &AppState, session: &Session) -> Vec<AttendanceRecord> {
    match load_recent_attendance(&state.db, state.config.list_row_limit).await {
        Ok(records) => records,
        Err(e) => {
            flash_store_error(session, "Loading attendance records", &e);
            Vec::new()
        }
    }
}

/// Records matching the list filters, in the requested order
async fn filtered_records(state: &AppState, session: &Session, query: &ListQuery) -> Vec<AttendanceRecord> {
    let mut records = query.filter().apply(load_records(state, session).await);
    sort_records(&mut records, query.sort_key(), query.sort_order());
    records
}

fn period_labels(state: &AppState) -> Vec<String> {
    state
        .periods
        .periods()
        .into_iter()
        .map(period_label)
        .chain(std::iter::once(OUT_OF_HOURS_LABEL.to_string()))
        .collect()
}

/// GET /list
pub async fn list_records(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListQuery>,
) -> Html<String> {
    let records = filtered_records(&state, &session, &query).await;
    let pagination = calculate_pagination(records.len(), parse_page(query.page.as_deref()));

    list_page(&ListView {
        rows: pagination.slice(&records),
        total: records.len(),
        query: &query,
        pagination,
        period_labels: period_labels(&state),
        flashes: session.take_flashes(),
    })
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// GET /by_period
pub async fn records_by_period(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DateQuery>,
) -> Html<String> {
    let date = query
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let records = match date {
        Some(date) => match parse_date(date) {
            Ok(day) => {
                let day = day.format("%Y-%m-%d").to_string();
                load_attendance_for_date(&state.db, &day)
                    .await
                    .unwrap_or_else(|e| {
                        flash_store_error(&session, "Loading attendance records", &e);
                        Vec::new()
                    })
            }
            Err(_) => {
                session.flash(FlashLevel::Warning, "Invalid date; showing recent records.");
                load_records(&state, &session).await
            }
        },
        None => load_records(&state, &session).await,
    };

    let groups = group_by_date_and_period(&records);
    by_period_page(&groups, date.unwrap_or(""), &session.take_flashes())
}

/// GET /stats
pub async fn stats_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    let records = load_records(&state, &session).await;
    let today = state.calendar.date_string(state.clock.now());
    let stats = compute_stats(&records, &today, &state.periods, state.config.capacity);
    crate::pages::stats_page(&stats, &today, &session.take_flashes())
}

#[derive(Debug, Deserialize)]
pub struct AdminAddForm {
    #[serde(default)]
    pub student_id: String,
}

/// POST /attendance/admin_add
///
/// Records attendance bypassing the weekly limit and period checks.
pub async fn admin_add_attendance(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<AdminAddForm>,
) -> Redirect {
    match admit(&state, &Submission::admin(&form.student_id)).await {
        Ok(record) => session.flash(
            FlashLevel::Success,
            format!(
                "Recorded {} ({}) for {}.",
                record.name, record.student_id, record.period
            ),
        ),
        Err(AdmissionError::Rejected(rejection)) => {
            session.flash(rejection_level(&rejection), rejection.message())
        }
        Err(AdmissionError::Store(e)) => flash_store_error(&session, "Adding attendance", &e),
    }
    Redirect::to("/list")
}

/// POST /delete_records with repeated `ids` fields
pub async fn delete_records(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Redirect {
    let ids: Vec<Uuid> = fields
        .iter()
        .filter(|(name, _)| name == "ids")
        .filter_map(|(_, value)| match Uuid::parse_str(value.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring malformed record id '{}'", value);
                None
            }
        })
        .collect();

    if ids.is_empty() {
        session.flash(FlashLevel::Warning, "No records selected.");
        return Redirect::to("/list");
    }

    match delete_attendance_many(&state.db, &ids).await {
        Ok(deleted) => {
            info!("Admin deleted {} attendance records", deleted);
            session.flash(FlashLevel::Success, format!("Deleted {} records.", deleted));
        }
        Err(e) => flash_store_error(&session, "Deleting records", &e),
    }
    Redirect::to("/list")
}

/// POST /delete_record/:id
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Redirect {
    let Some(id) = parse_path_id(&session, &id) else {
        return Redirect::to("/list");
    };

    match delete_attendance(&state.db, id).await {
        Ok(true) => {
            info!("Admin deleted attendance record {}", id);
            session.flash(FlashLevel::Success, "Record deleted.");
        }
        Ok(false) => session.flash(FlashLevel::Warning, "Record not found."),
        Err(e) => flash_store_error(&session, "Deleting the record", &e),
    }
    Redirect::to("/list")
}

#[derive(Debug, Deserialize)]
pub struct DeleteBeforeForm {
    #[serde(default)]
    pub cutoff_date: String,
}

/// POST /delete_before
///
/// Removes every record before local midnight of the cutoff date.
pub async fn delete_before(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<DeleteBeforeForm>,
) -> Redirect {
    let date = match parse_date(&form.cutoff_date) {
        Ok(date) => date,
        Err(_) => {
            session.flash(FlashLevel::Danger, "Please choose a valid cutoff date.");
            return Redirect::to("/list");
        }
    };

    let cutoff = state.calendar.start_of_day(date);
    match delete_attendance_before(&state.db, cutoff).await {
        Ok(deleted) => {
            warn!("Admin deleted {} attendance records before {}", deleted, date);
            session.flash(
                FlashLevel::Success,
                format!("Deleted {} records before {}.", deleted, date),
            );
        }
        Err(e) => flash_store_error(&session, "Deleting old records", &e),
    }
    Redirect::to("/list")
}

fn download(bytes: Vec<u8>, content_type: &'static str, file_name: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn export_stamp(state: &AppState) -> String {
    state
        .calendar
        .local(state.clock.now())
        .format("%Y%m%d_%H%M%S")
        .to_string()
}

/// GET /export/csv
pub async fn export_csv(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListQuery>,
) -> Response {
    let records = filtered_records(&state, &session, &query).await;
    match export::to_csv(&records) {
        Ok(bytes) => {
            info!("Exported {} records as CSV", records.len());
            download(
                bytes,
                "text/csv; charset=utf-8",
                &export::file_name(&export_stamp(&state), "csv"),
            )
        }
        Err(e) => {
            error!("CSV export failed: {}", e);
            session.flash(FlashLevel::Danger, "CSV export failed.");
            Redirect::to("/list").into_response()
        }
    }
}

/// GET /export/xlsx
pub async fn export_xlsx(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListQuery>,
) -> Response {
    let records = filtered_records(&state, &session, &query).await;
    match export::to_xlsx(&records) {
        Ok(bytes) => {
            info!("Exported {} records as XLSX", records.len());
            download(
                bytes,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                &export::file_name(&export_stamp(&state), "xlsx"),
            )
        }
        Err(e) => {
            error!("XLSX export failed: {}", e);
            session.flash(FlashLevel::Danger, "Excel export failed.");
            Redirect::to("/list").into_response()
        }
    }
}
