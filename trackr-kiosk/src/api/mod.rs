//! HTTP handlers for trackr-kiosk

pub mod auth;
pub mod error;
pub mod health;
pub mod kiosk;
pub mod memos;
pub mod records;
pub mod students;
pub mod ui;
pub mod warnings;

pub use auth::{admin_login, admin_login_page, logout, require_admin_json, require_admin_page};
pub use error::ApiError;
pub use health::health_routes;
pub use kiosk::{attendance_page, index, lookup_name, submit_attendance};
pub use memos::{memos_page, save_memo};
pub use records::{
    admin_add_attendance, delete_before, delete_record, delete_records, export_csv, export_xlsx,
    list_records, records_by_period, stats_page,
};
pub use students::{add_direct_student, bulk_update_seats, delete_student, students_page, update_seat};
pub use ui::serve_css;
pub use warnings::{
    add_warning, deactivate_warning, delete_all_warnings, delete_warning, warnings_page,
    MAX_WARNING_DAYS,
};

use tracing::error;
use uuid::Uuid;

use crate::session::{FlashLevel, Session};

/// Log a store failure and tell the admin on the next page
pub(crate) fn flash_store_error(session: &Session, action: &str, err: &trackr_common::Error) {
    error!("{} failed: {}", action, err);
    session.flash(FlashLevel::Danger, format!("{} failed. Please try again.", action));
}

/// Parse an id taken from a URL path, flashing on failure
pub(crate) fn parse_path_id(session: &Session, raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            session.flash(FlashLevel::Danger, "Invalid id.");
            None
        }
    }
}
