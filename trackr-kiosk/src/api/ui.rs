//! Static assets

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

const TRACKR_CSS: &str = include_str!("../../ui/trackr.css");

/// GET /static/trackr.css
pub async fn serve_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        TRACKR_CSS,
    )
        .into_response()
}
