//! Server-rendered HTML pages
//!
//! Pages are plain `format!` templates around a shared layout. Every value
//! that came from a user or the roster goes through [`escape`].

mod admin;
mod kiosk;
mod manage;

pub use admin::{by_period_page, list_page, login_page, stats_page, ListView};
pub use kiosk::{kiosk_page, KioskView};
pub use manage::{memos_page, students_page, warnings_page, MemoView, WarningRow};

use axum::response::Html;

use crate::session::Flash;

/// Escape text for HTML element and attribute content
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn render_flashes(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|f| {
            format!(
                r#"<div class="flash flash-{}">{}</div>"#,
                f.level.as_str(),
                escape(&f.message)
            )
        })
        .collect()
}

const ADMIN_NAV: &str = r#"<nav>
        <a href="/list">Records</a>
        <a href="/by_period">By period</a>
        <a href="/stats">Statistics</a>
        <a href="/admin/warnings">Warnings</a>
        <a href="/admin/students">Students</a>
        <a href="/admin/memos">Memos</a>
        <a href="/attendance">Kiosk</a>
        <a href="/logout">Log out</a>
    </nav>"#;

/// Wrap page content in the shared layout
fn layout(title: &str, flashes: &[Flash], admin_nav: bool, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - trackr</title>
    <link rel="stylesheet" href="/static/trackr.css">
</head>
<body>
<header>
    <h1>{title}</h1>
    {nav}
</header>
<main>
    {flashes}
    {body}
</main>
<footer>trackr-kiosk v{version}</footer>
</body>
</html>"#,
        title = escape(title),
        nav = if admin_nav { ADMIN_NAV } else { "" },
        flashes = render_flashes(flashes),
        body = body,
        version = env!("CARGO_PKG_VERSION"),
    ))
}
