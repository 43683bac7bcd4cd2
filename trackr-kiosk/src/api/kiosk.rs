//! Kiosk page, check-in submission and roster name lookup

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::ApiError;
use crate::admission::{admit, AdmissionError, Rejection, Submission};
use crate::pages::{kiosk_page, KioskView};
use crate::session::{FlashLevel, Session};
use crate::AppState;

/// GET /
pub async fn index() -> Redirect {
    Redirect::to("/attendance")
}

/// GET /attendance
pub async fn attendance_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    let now = state.clock.now();
    let current = state.periods.period_at(state.calendar.local(now));

    kiosk_page(&KioskView {
        now_display: state.calendar.display_string(now),
        period_display: current.display(),
        periods: state.periods.describe(),
        flashes: session.take_flashes(),
        is_admin: session.is_admin(),
    })
}

#[derive(Debug, Deserialize)]
pub struct AttendanceForm {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub(crate) fn rejection_level(rejection: &Rejection) -> FlashLevel {
    match rejection {
        Rejection::MissingStudentId
        | Rejection::UnknownStudent
        | Rejection::NameMismatch
        | Rejection::Warned { .. } => FlashLevel::Danger,
        _ => FlashLevel::Warning,
    }
}

/// POST /attendance
pub async fn submit_attendance(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<AttendanceForm>,
) -> Redirect {
    let submission = Submission::kiosk(&form.student_id, form.name.as_deref());

    match admit(&state, &submission).await {
        Ok(record) => session.flash(
            FlashLevel::Success,
            format!(
                "Welcome, {}! Checked in for {} at {} (seat {}).",
                record.name, record.period, record.time_only, record.seat
            ),
        ),
        Err(AdmissionError::Rejected(rejection)) => {
            session.flash(rejection_level(&rejection), rejection.message())
        }
        Err(AdmissionError::Store(e)) => {
            error!("Attendance submission failed: {}", e);
            session.flash(
                FlashLevel::Danger,
                "Attendance could not be recorded. Please ask a librarian.",
            );
        }
    }

    Redirect::to("/attendance")
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub student_id: Option<String>,
}

/// GET /lookup_name?student_id=
pub async fn lookup_name(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Value>, ApiError> {
    let student_id = query.student_id.as_deref().map(str::trim).unwrap_or("");
    if student_id.is_empty() {
        return Err(ApiError::BadRequest("student_id is required".to_string()));
    }

    let student = state
        .lookup_student(student_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    Ok(Json(json!({
        "student_id": student.student_id,
        "name": student.name,
        "seat": student.seat,
    })))
}
