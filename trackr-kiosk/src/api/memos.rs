//! Period memo pages

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    Extension, Form,
};
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;
use tracing::info;
use trackr_common::db::{self, PeriodMemo};
use trackr_common::period::period_label;
use trackr_common::time::parse_date;

use super::flash_store_error;
use crate::pages::{self, MemoView};
use crate::reporting::QUERY_VALUE;
use crate::session::{FlashLevel, Session};
use crate::AppState;

/// Number of memos in the recent list
const RECENT_MEMOS: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct MemoQuery {
    pub date: Option<String>,
}

/// GET /admin/memos?date=
pub async fn memos_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<MemoQuery>,
) -> Html<String> {
    let today = state.calendar.date_of(state.clock.now());
    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => today,
        Some(raw) => parse_date(raw).unwrap_or_else(|_| {
            session.flash(FlashLevel::Warning, "Invalid date; showing today.");
            today
        }),
    };
    let date = date.format("%Y-%m-%d").to_string();

    let existing = db::load_memos_for_date(&state.db, &date)
        .await
        .unwrap_or_else(|e| {
            flash_store_error(&session, "Loading memos", &e);
            Vec::new()
        });
    let recent = db::load_recent_memos(&state.db, RECENT_MEMOS)
        .await
        .unwrap_or_else(|e| {
            flash_store_error(&session, "Loading recent memos", &e);
            Vec::new()
        });

    let slots = state
        .periods
        .periods()
        .into_iter()
        .map(|n| {
            let label = period_label(n);
            let text = existing
                .iter()
                .find(|m| m.period == label)
                .map(|m| m.memo_text.clone())
                .unwrap_or_default();
            (label, text)
        })
        .collect();

    pages::memos_page(&MemoView {
        date,
        slots,
        recent,
        flashes: session.take_flashes(),
    })
}

#[derive(Debug, Deserialize)]
pub struct MemoForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub memo_text: String,
}

/// POST /admin/memos
pub async fn save_memo(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<MemoForm>,
) -> Redirect {
    let date = match parse_date(&form.date) {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => {
            session.flash(FlashLevel::Danger, "Invalid memo date.");
            return Redirect::to("/admin/memos");
        }
    };
    let period = form.period.trim();
    if period.is_empty() {
        session.flash(FlashLevel::Danger, "Memo period is required.");
        return Redirect::to("/admin/memos");
    }

    let memo = PeriodMemo {
        date: date.clone(),
        period: period.to_string(),
        memo_text: form.memo_text.trim().to_string(),
        updated_at: state.clock.now(),
    };
    match db::save_memo(&state.db, &memo).await {
        Ok(()) => {
            info!("Memo saved for {} {}", memo.date, memo.period);
            session.flash(FlashLevel::Success, format!("Memo saved for {} {}.", date, period));
        }
        Err(e) => flash_store_error(&session, "Saving the memo", &e),
    }
    Redirect::to(&format!("/admin/memos?date={}", utf8_percent_encode(&date, QUERY_VALUE)))
}
