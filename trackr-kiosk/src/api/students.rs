//! Roster administration

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{Html, Redirect},
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use trackr_common::roster::{AddOutcome, SeatChange};
use trackr_common::{Error, RosterEntry};

use super::{flash_store_error, ApiError};
use crate::pages;
use crate::session::{FlashLevel, Session};
use crate::AppState;

/// GET /admin/students
pub async fn students_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    let entries = state
        .with_roster(|roster| Ok(roster.sorted_entries()))
        .await
        .unwrap_or_else(|e| {
            flash_store_error(&session, "Loading the roster", &e);
            Vec::new()
        });
    pages::students_page(&entries, &session.take_flashes())
}

#[derive(Debug, Deserialize)]
pub struct SeatForm {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub seat: String,
}

/// POST /update_seat
pub async fn update_seat(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<SeatForm>,
) -> Redirect {
    let student_id = form.student_id.trim().to_string();
    let updated = {
        let (student_id, seat) = (student_id.clone(), form.seat);
        state
            .with_roster(move |roster| roster.update_seat(&student_id, &seat))
            .await
    };
    match updated {
        Ok(entry) => {
            info!("Seat of {} set to '{}'", entry.student_id, entry.seat);
            session.flash(
                FlashLevel::Success,
                format!("Seat of {} updated to {}.", entry.name, entry.seat),
            );
        }
        Err(Error::NotFound(_)) => session.flash(
            FlashLevel::Danger,
            format!("Student {} is not on the roster.", student_id),
        ),
        Err(e) => flash_store_error(&session, "Updating the seat", &e),
    }
    Redirect::to("/admin/students")
}

#[derive(Debug, Deserialize)]
pub struct AddStudentRequest {
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub seat: Option<String>,
}

/// POST /api/add_direct_student
pub async fn add_direct_student(
    State(state): State<AppState>,
    payload: Result<Json<AddStudentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let entry = RosterEntry::new(
        &request.student_id,
        &request.name,
        request.seat.as_deref().unwrap_or(""),
    );
    let outcome = {
        let entry = entry.clone();
        state
            .with_roster(move |roster| roster.add_student(entry))
            .await?
    };
    match outcome {
        AddOutcome::Added => {
            info!("Student {} added to roster", entry.student_id);
            Ok(Json(json!({
                "success": true,
                "message": format!("Added {} ({}).", entry.name, entry.student_id),
            })))
        }
        AddOutcome::AlreadyExists => Err(ApiError::BadRequest(format!(
            "Student {} already exists.",
            entry.student_id
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    #[serde(default)]
    pub changes: Vec<SeatChange>,
}

/// POST /api/bulk_update_seats
pub async fn bulk_update_seats(
    State(state): State<AppState>,
    payload: Result<Json<BulkUpdateRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    if request.changes.is_empty() {
        return Err(ApiError::BadRequest("No changes given.".to_string()));
    }

    let changes = request.changes;
    let summary = state
        .with_roster(move |roster| roster.bulk_update(&changes))
        .await?;
    info!(
        "Bulk roster update: {} seats, {} names changed, {} not found",
        summary.seats_changed, summary.names_changed, summary.not_found
    );
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "{} seats and {} names changed; {} students not found.",
            summary.seats_changed, summary.names_changed, summary.not_found
        ),
        "seats_changed": summary.seats_changed,
        "names_changed": summary.names_changed,
        "not_found": summary.not_found,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteStudentRequest {
    pub student_id: String,
}

/// POST /api/delete_student
pub async fn delete_student(
    State(state): State<AppState>,
    payload: Result<Json<DeleteStudentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let student_id = request.student_id;
    let removed = state
        .with_roster(move |roster| roster.delete_student(&student_id))
        .await?;
    info!("Student {} removed from roster", removed.student_id);
    Ok(Json(json!({
        "success": true,
        "message": format!("Removed {} ({}).", removed.name, removed.student_id),
    })))
}
