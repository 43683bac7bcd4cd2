//! Warning administration

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Extension, Form,
};
use serde::Deserialize;
use tracing::{info, warn};
use trackr_common::db::{self, Warning};

use super::{flash_store_error, parse_path_id};
use crate::pages::{self, WarningRow};
use crate::session::{FlashLevel, Session};
use crate::AppState;

const WARNINGS_PAGE: &str = "/admin/warnings";

/// Longest warning an admin can issue, about ten years
pub const MAX_WARNING_DAYS: i64 = 3650;

/// GET /admin/warnings
pub async fn warnings_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    let now = state.clock.now();
    let warnings = db::load_all_warnings(&state.db).await.unwrap_or_else(|e| {
        flash_store_error(&session, "Loading warnings", &e);
        Vec::new()
    });

    let rows: Vec<WarningRow> = warnings
        .into_iter()
        .map(|warning| {
            let status = if !warning.is_active {
                "inactive"
            } else if warning.is_in_force(now) {
                "active"
            } else {
                "expired"
            };
            WarningRow {
                status,
                issued: state.calendar.display_string(warning.warning_date),
                expires: state.calendar.display_string(warning.expiry_date),
                warning,
            }
        })
        .collect();

    pages::warnings_page(&rows, state.config.warning_days, &session.take_flashes())
}

#[derive(Debug, Deserialize)]
pub struct WarningForm {
    #[serde(default)]
    pub student_id: String,
    pub days: Option<String>,
    pub reason: Option<String>,
}

/// POST /admin/warnings/add
pub async fn add_warning(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<WarningForm>,
) -> Redirect {
    let student_id = form.student_id.trim();
    let student = match state.lookup_student(student_id).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            session.flash(FlashLevel::Danger, format!("Student {} is not on the roster.", student_id));
            return Redirect::to(WARNINGS_PAGE);
        }
        Err(e) => {
            flash_store_error(&session, "Looking up the student", &e);
            return Redirect::to(WARNINGS_PAGE);
        }
    };

    let days = match form.days.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => state.config.warning_days,
        Some(raw) => match raw.parse::<i64>() {
            Ok(days) if (1..=MAX_WARNING_DAYS).contains(&days) => days,
            _ => {
                session.flash(
                    FlashLevel::Danger,
                    format!("Days must be a number from 1 to {}.", MAX_WARNING_DAYS),
                );
                return Redirect::to(WARNINGS_PAGE);
            }
        },
    };

    let warning = match Warning::new(
        &student.student_id,
        &student.name,
        form.reason.as_deref(),
        state.clock.now(),
        days,
    ) {
        Ok(warning) => warning,
        Err(e) => {
            session.flash(FlashLevel::Danger, e.to_string());
            return Redirect::to(WARNINGS_PAGE);
        }
    };
    match db::save_warning(&state.db, &warning).await {
        Ok(()) => {
            info!(
                "Warning issued to {} for {} days: {}",
                warning.student_id, days, warning.reason
            );
            session.flash(
                FlashLevel::Success,
                format!(
                    "Warning issued to {} until {}.",
                    student.name,
                    state.calendar.display_string(warning.expiry_date)
                ),
            );
        }
        Err(e) => flash_store_error(&session, "Issuing the warning", &e),
    }
    Redirect::to(WARNINGS_PAGE)
}

/// POST /admin/warnings/:id/deactivate
pub async fn deactivate_warning(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Redirect {
    let Some(id) = parse_path_id(&session, &id) else {
        return Redirect::to(WARNINGS_PAGE);
    };
    match db::deactivate_warning(&state.db, id).await {
        Ok(true) => {
            info!("Warning {} lifted", id);
            session.flash(FlashLevel::Success, "Warning lifted.");
        }
        Ok(false) => session.flash(FlashLevel::Warning, "Warning not found."),
        Err(e) => flash_store_error(&session, "Lifting the warning", &e),
    }
    Redirect::to(WARNINGS_PAGE)
}

/// POST /admin/warnings/:id/delete
pub async fn delete_warning(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Redirect {
    let Some(id) = parse_path_id(&session, &id) else {
        return Redirect::to(WARNINGS_PAGE);
    };
    match db::delete_warning(&state.db, id).await {
        Ok(true) => {
            info!("Warning {} deleted", id);
            session.flash(FlashLevel::Success, "Warning deleted.");
        }
        Ok(false) => session.flash(FlashLevel::Warning, "Warning not found."),
        Err(e) => flash_store_error(&session, "Deleting the warning", &e),
    }
    Redirect::to(WARNINGS_PAGE)
}

/// POST /admin/warnings/delete_all
pub async fn delete_all_warnings(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Redirect {
    match db::delete_all_warnings(&state.db).await {
        Ok(deleted) => {
            warn!("All warnings deleted ({})", deleted);
            session.flash(FlashLevel::Success, format!("Deleted {} warnings.", deleted));
        }
        Err(e) => flash_store_error(&session, "Deleting warnings", &e),
    }
    Redirect::to(WARNINGS_PAGE)
}
