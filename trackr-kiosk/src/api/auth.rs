//! Admin login, logout and the admin guards

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::ApiError;
use crate::pages::login_page;
use crate::session::{FlashLevel, Session};
use crate::AppState;

/// GET /admin
pub async fn admin_login_page(Extension(session): Extension<Session>) -> Response {
    if session.is_admin() {
        return Redirect::to("/list").into_response();
    }
    login_page(&session.take_flashes()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

/// POST /admin
pub async fn admin_login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<LoginForm>,
) -> Redirect {
    if state.secrets.accepts(&form.password) {
        session.set_admin(true);
        info!("Admin logged in");
        session.flash(FlashLevel::Success, "Logged in as administrator.");
        Redirect::to("/list")
    } else {
        warn!("Failed admin login attempt");
        session.flash(FlashLevel::Danger, "Incorrect password.");
        Redirect::to("/admin")
    }
}

/// GET /logout
pub async fn logout(Extension(session): Extension<Session>) -> Redirect {
    if session.is_admin() {
        info!("Admin logged out");
    }
    session.clear();
    session.flash(FlashLevel::Info, "Logged out.");
    Redirect::to("/attendance")
}

/// Guard for admin HTML pages: anonymous visitors go to the login page
pub async fn require_admin_page(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Response {
    if session.is_admin() {
        return next.run(request).await;
    }
    session.flash(FlashLevel::Warning, "Please log in as an administrator.");
    Redirect::to("/admin").into_response()
}

/// Guard for admin JSON endpoints
pub async fn require_admin_json(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Response {
    if session.is_admin() {
        return next.run(request).await;
    }
    ApiError::Forbidden("Admin login required".to_string()).into_response()
}
