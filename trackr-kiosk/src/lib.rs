//! trackr-kiosk library - library attendance kiosk service
//!
//! Students check in at a kiosk page; librarians review, export and prune
//! records and manage the roster, warnings and period memos.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use trackr_common::config::{KioskConfig, Secrets};
use trackr_common::{Clock, PeriodTable, RosterCache, RosterEntry, RosterStore, SchoolCalendar};

pub mod admission;
pub mod api;
pub mod export;
pub mod pages;
pub mod pagination;
pub mod reporting;
pub mod session;

use session::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub roster: Arc<RosterCache>,
    pub sessions: Arc<SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub calendar: SchoolCalendar,
    pub periods: Arc<PeriodTable>,
    pub config: Arc<KioskConfig>,
    pub secrets: Arc<Secrets>,
    /// CSV copy of accepted records, when enabled
    pub backup_path: Option<PathBuf>,
}

impl AppState {
    /// Assemble state for a root folder
    pub fn new(
        db: SqlitePool,
        root_folder: &Path,
        config: KioskConfig,
        secrets: Secrets,
        clock: Arc<dyn Clock>,
    ) -> trackr_common::Result<Self> {
        let roster = RosterCache::new(
            RosterStore::new(config.roster_path(root_folder)),
            Duration::from_secs(config.roster_ttl_secs),
        );
        let sessions = SessionStore::new(secrets.session_secret.clone(), Arc::clone(&clock));
        let backup_path = config
            .csv_backup
            .then(|| config.backup_path(root_folder));

        Ok(Self {
            db,
            roster: Arc::new(roster),
            sessions: Arc::new(sessions),
            clock,
            calendar: config.calendar()?,
            periods: Arc::new(config.period_table()?),
            config: Arc::new(config),
            secrets: Arc::new(secrets),
            backup_path,
        })
    }

    /// Run roster file work on the blocking pool
    ///
    /// Reloads and rewrites of the spreadsheet touch the disk, so they stay
    /// off the async worker threads.
    pub async fn with_roster<T, F>(&self, work: F) -> trackr_common::Result<T>
    where
        F: FnOnce(&RosterCache) -> trackr_common::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let roster = Arc::clone(&self.roster);
        tokio::task::spawn_blocking(move || work(&roster))
            .await
            .map_err(|e| trackr_common::Error::Internal(format!("Roster task failed: {}", e)))?
    }

    /// Roster entry for a student id, read off the async threads
    pub async fn lookup_student(&self, student_id: &str) -> trackr_common::Result<Option<RosterEntry>> {
        let student_id = student_id.to_string();
        self.with_roster(move |roster| Ok(roster.lookup(&student_id)))
            .await
    }
}

/// Build application router
///
/// Admin HTML pages redirect anonymous visitors to the login page; admin
/// JSON endpoints answer 403 instead.
pub fn build_router(state: AppState) -> Router {
    let admin_pages = Router::new()
        .route("/list", get(api::list_records))
        .route("/by_period", get(api::records_by_period))
        .route("/stats", get(api::stats_page))
        .route("/attendance/admin_add", post(api::admin_add_attendance))
        .route("/delete_records", post(api::delete_records))
        .route("/delete_record/:id", post(api::delete_record))
        .route("/delete_before", post(api::delete_before))
        .route("/export/csv", get(api::export_csv))
        .route("/export/xlsx", get(api::export_xlsx))
        .route("/admin/warnings", get(api::warnings_page))
        .route("/admin/warnings/add", post(api::add_warning))
        .route("/admin/warnings/delete_all", post(api::delete_all_warnings))
        .route("/admin/warnings/:id/deactivate", post(api::deactivate_warning))
        .route("/admin/warnings/:id/delete", post(api::delete_warning))
        .route("/admin/students", get(api::students_page))
        .route("/update_seat", post(api::update_seat))
        .route("/admin/memos", get(api::memos_page).post(api::save_memo))
        .layer(middleware::from_fn(api::require_admin_page));

    let admin_api = Router::new()
        .route("/api/add_direct_student", post(api::add_direct_student))
        .route("/api/bulk_update_seats", post(api::bulk_update_seats))
        .route("/api/delete_student", post(api::delete_student))
        .layer(middleware::from_fn(api::require_admin_json));

    let public = Router::new()
        .route("/", get(api::index))
        .route(
            "/attendance",
            get(api::attendance_page).post(api::submit_attendance),
        )
        .route("/lookup_name", get(api::lookup_name))
        .route("/admin", get(api::admin_login_page).post(api::admin_login))
        .route("/logout", get(api::logout))
        .route("/static/trackr.css", get(api::serve_css))
        .merge(api::health_routes());

    Router::new()
        .merge(admin_pages)
        .merge(admin_api)
        .merge(public)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
