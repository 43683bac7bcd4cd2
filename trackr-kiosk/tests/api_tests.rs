//! HTTP-level tests for trackr-kiosk
//!
//! Each test builds the full router over an in-memory database, a temporary
//! roster and a clock pinned to Monday 2026-10-19 10:00 in Seoul (period 2).

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use trackr_common::config::{KioskConfig, Secrets};
use trackr_common::db::{count_attendance, create_schema, load_all_warnings, load_recent_attendance};
use trackr_common::time::FixedClock;
use trackr_common::SchoolCalendar;
use trackr_kiosk::{build_router, AppState};

const ADMIN_PASSWORD: &str = "librarian";

struct TestApp {
    router: Router,
    state: AppState,
    clock: Arc<FixedClock>,
    _dir: TempDir,
}

fn kst(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    SchoolCalendar::default()
        .offset()
        .with_ymd_and_hms(2026, 10, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

async fn setup_test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("students.csv"),
        "student_id,name,seat\n10101,Kim Minji,12\n10102,Lee Jun,13\n",
    )
    .unwrap();

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();

    let secrets = Secrets {
        admin_password: ADMIN_PASSWORD.to_string(),
        admin_access_id: None,
        session_secret: Some("test-secret".to_string()),
    };
    let config = KioskConfig {
        roster_file: "students.csv".to_string(),
        ..KioskConfig::default()
    };
    let clock = Arc::new(FixedClock::new(kst(19, 10, 0)));
    let state = AppState::new(pool, dir.path(), config, secrets, clock.clone()).unwrap();

    TestApp {
        router: build_router(state.clone()),
        state,
        clock,
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Log in and return the admin session cookie
    async fn login(&self) -> String {
        let response = self
            .post_form("/admin", &format!("password={}", ADMIN_PASSWORD), None)
            .await;
        assert_eq!(location(&response), "/list");
        session_cookie(&response)
    }
}

fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set the session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("expected a redirect")
        .to_str()
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_test_app().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "trackr-kiosk");
}

#[tokio::test]
async fn test_root_redirects_to_kiosk() {
    let app = setup_test_app().await;

    let response = app.get("/", None).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/attendance");
}

#[tokio::test]
async fn test_kiosk_page_shows_current_period() {
    let app = setup_test_app().await;

    let response = app.get("/attendance", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());

    let html = body_text(response).await;
    assert!(html.contains("Period 2"));
}

#[tokio::test]
async fn test_checkin_flashes_and_second_visit_rejected() {
    let app = setup_test_app().await;

    let response = app
        .post_form("/attendance", "student_id=10101&name=Kim+Minji", None)
        .await;
    assert_eq!(location(&response), "/attendance");
    let cookie = session_cookie(&response);

    let html = body_text(app.get("/attendance", Some(&cookie)).await).await;
    assert!(html.contains("flash-success"));
    assert!(html.contains("Kim Minji"));

    // Flash is shown once
    let html = body_text(app.get("/attendance", Some(&cookie)).await).await;
    assert!(!html.contains("flash-success"));

    let response = app
        .post_form("/attendance", "student_id=10101&name=Kim+Minji", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/attendance");
    let html = body_text(app.get("/attendance", Some(&cookie)).await).await;
    assert!(html.contains("already used the library this week"));

    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_checkin_unknown_student_rejected() {
    let app = setup_test_app().await;

    let response = app.post_form("/attendance", "student_id=99999", None).await;
    let cookie = session_cookie(&response);

    let html = body_text(app.get("/attendance", Some(&cookie)).await).await;
    assert!(html.contains("flash-danger"));
    assert!(html.contains("not on the library roster"));
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_lookup_name() {
    let app = setup_test_app().await;

    let response = app.get("/lookup_name?student_id=10102", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "Lee Jun");
    assert_eq!(json["seat"], "13");

    let response = app.get("/lookup_name?student_id=", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/lookup_name?student_id=55555", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_admin_pages_require_login() {
    let app = setup_test_app().await;

    for uri in ["/list", "/stats", "/admin/warnings", "/admin/students", "/export/csv"] {
        let response = app.get(uri, None).await;
        assert!(response.status().is_redirection(), "{} should redirect", uri);
        assert_eq!(location(&response), "/admin");
    }

    let response = app
        .post_json(
            "/api/delete_student",
            serde_json::json!({"student_id": "10101"}),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.state.roster.lookup("10101").is_some());
}

#[tokio::test]
async fn test_wrong_password_stays_logged_out() {
    let app = setup_test_app().await;

    let response = app.post_form("/admin", "password=guess", None).await;
    assert_eq!(location(&response), "/admin");
    let cookie = session_cookie(&response);

    let response = app.get("/list", Some(&cookie)).await;
    assert_eq!(location(&response), "/admin");
}

#[tokio::test]
async fn test_admin_list_and_delete_records() {
    let app = setup_test_app().await;
    app.post_form("/attendance", "student_id=10101", None).await;
    app.post_form("/attendance", "student_id=10102", None).await;

    let cookie = app.login().await;

    let response = app.get("/list", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Kim Minji"));
    assert!(html.contains("Lee Jun"));

    let html = body_text(app.get("/list?student_id=10102", Some(&cookie)).await).await;
    assert!(!html.contains("Kim Minji"));
    assert!(html.contains("Lee Jun"));

    let records = load_recent_attendance(&app.state.db, 10).await.unwrap();
    let target = records.iter().find(|r| r.student_id == "10101").unwrap();
    let response = app
        .post_form(&format!("/delete_record/{}", target.id), "", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/list");
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 1);

    let html = body_text(app.get("/list", Some(&cookie)).await).await;
    assert!(!html.contains("Kim Minji"));
    assert!(html.contains("Lee Jun"));
    let csv = body_text(app.get("/export/csv", Some(&cookie)).await).await;
    assert!(!csv.contains("Kim Minji"));
    assert!(csv.contains("Lee Jun"));

    let remaining = load_recent_attendance(&app.state.db, 10).await.unwrap();
    let response = app
        .post_form(
            "/delete_records",
            &format!("ids={}&ids=not-a-uuid", remaining[0].id),
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&response), "/list");
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 0);

    let html = body_text(app.get("/list", Some(&cookie)).await).await;
    assert!(!html.contains("Lee Jun"));
    let csv = body_text(app.get("/export/csv", Some(&cookie)).await).await;
    assert!(!csv.contains("Lee Jun"));
}

#[tokio::test]
async fn test_delete_before_cutoff_date() {
    let app = setup_test_app().await;
    app.post_form("/attendance", "student_id=10101", None).await;

    // The following Monday, same period
    app.clock.set(kst(26, 10, 0));
    app.post_form("/attendance", "student_id=10102", None).await;
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 2);

    let cookie = app.login().await;

    let response = app
        .post_form("/delete_before", "cutoff_date=not-a-date", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/list");
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 2);
    let html = body_text(app.get("/list", Some(&cookie)).await).await;
    assert!(html.contains("valid cutoff date"));

    // Records on the cutoff date itself are kept
    let response = app
        .post_form("/delete_before", "cutoff_date=2026-10-19", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/list");
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 2);

    app.post_form("/delete_before", "cutoff_date=2026-10-26", Some(&cookie))
        .await;
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 1);

    let html = body_text(app.get("/list", Some(&cookie)).await).await;
    assert!(html.contains("Deleted 1 records before 2026-10-26."));
    assert!(!html.contains("Kim Minji"));
    assert!(html.contains("Lee Jun"));
    let csv = body_text(app.get("/export/csv", Some(&cookie)).await).await;
    assert!(!csv.contains("Kim Minji"));
}

#[tokio::test]
async fn test_list_page_out_of_range_is_clamped() {
    let app = setup_test_app().await;
    app.post_form("/attendance", "student_id=10101", None).await;
    let cookie = app.login().await;

    let response = app.get("/list?page=99", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Kim Minji"));

    let response = app.get("/list?page=abc", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_exports_download_files() {
    let app = setup_test_app().await;
    app.post_form("/attendance", "student_id=10101", None).await;
    let cookie = app.login().await;

    let response = app.get("/export/csv", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attendance_20261019_100000.csv"));
    let csv = body_text(response).await;
    assert!(csv.starts_with('\u{feff}'));
    assert!(csv.contains("10101"));

    let response = app.get("/export/xlsx", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_admin_add_bypasses_weekly_limit() {
    let app = setup_test_app().await;
    app.post_form("/attendance", "student_id=10101", None).await;
    let cookie = app.login().await;

    let response = app
        .post_form("/attendance/admin_add", "student_id=10101", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/list");
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_warning_blocks_checkin() {
    let app = setup_test_app().await;
    let cookie = app.login().await;

    let response = app
        .post_form(
            "/admin/warnings/add",
            "student_id=10102&days=7&reason=Noise",
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&response), "/admin/warnings");

    let html = body_text(app.get("/admin/warnings", Some(&cookie)).await).await;
    assert!(html.contains("Noise"));
    assert!(html.contains("status-active"));

    let response = app.post_form("/attendance", "student_id=10102", None).await;
    let kiosk_cookie = session_cookie(&response);
    let html = body_text(app.get("/attendance", Some(&kiosk_cookie)).await).await;
    assert!(html.contains("suspended"));
    assert_eq!(count_attendance(&app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_warning_days_out_of_range_rejected() {
    let app = setup_test_app().await;
    let cookie = app.login().await;

    for days in ["100000000", "0", "-3", "3651", "soon"] {
        let response = app
            .post_form(
                "/admin/warnings/add",
                &format!("student_id=10101&days={}", days),
                Some(&cookie),
            )
            .await;
        assert_eq!(location(&response), "/admin/warnings");

        let html = body_text(app.get("/admin/warnings", Some(&cookie)).await).await;
        assert!(html.contains("Days must be a number from 1 to 3650."), "days={}", days);
    }
    assert!(load_all_warnings(&app.state.db).await.unwrap().is_empty());

    app.post_form(
        "/admin/warnings/add",
        "student_id=10101&days=3650",
        Some(&cookie),
    )
    .await;
    assert_eq!(load_all_warnings(&app.state.db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_student_json_api_rejects_bad_bodies() {
    let app = setup_test_app().await;
    let cookie = app.login().await;

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/add_direct_student")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, &cookie)
        .body(Body::from("{\"student_id\": "))
        .unwrap();
    let response = app.send(malformed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app
        .post_json(
            "/api/add_direct_student",
            serde_json::json!({"student_id": "10199"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("name"));

    let response = app
        .post_json("/api/delete_student", serde_json::json!({}), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app
        .post_json(
            "/api/bulk_update_seats",
            serde_json::json!({"changes": "all"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    assert!(app.state.roster.lookup("10199").is_none());
}

#[tokio::test]
async fn test_student_json_api() {
    let app = setup_test_app().await;
    let cookie = app.login().await;

    let response = app
        .post_json(
            "/api/add_direct_student",
            serde_json::json!({"student_id": "10199", "name": "Choi Yuna", "seat": "40"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
    assert_eq!(app.state.roster.lookup("10199").unwrap().seat, "40");

    let response = app
        .post_json(
            "/api/add_direct_student",
            serde_json::json!({"student_id": "10199", "name": "Choi Yuna"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/bulk_update_seats",
            serde_json::json!({"changes": [
                {"student_id": "10101", "new_seat": "99"},
                {"student_id": "00000", "new_seat": "1"}
            ]}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["seats_changed"], 1);
    assert_eq!(json["not_found"], 1);
    assert_eq!(app.state.roster.lookup("10101").unwrap().seat, "99");

    let response = app
        .post_json(
            "/api/delete_student",
            serde_json::json!({"student_id": "10199"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.state.roster.lookup("10199").is_none());

    let response = app
        .post_json(
            "/api/delete_student",
            serde_json::json!({"student_id": "10199"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_memo_saved_and_shown() {
    let app = setup_test_app().await;
    let cookie = app.login().await;

    let response = app
        .post_form(
            "/admin/memos",
            "date=2026-10-19&period=Period+3&memo_text=Exam+prep+group",
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&response), "/admin/memos?date=2026-10-19");

    let html = body_text(app.get("/admin/memos?date=2026-10-19", Some(&cookie)).await).await;
    assert!(html.contains("Exam prep group"));
}

#[tokio::test]
async fn test_logout_drops_admin() {
    let app = setup_test_app().await;
    let cookie = app.login().await;

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(location(&response), "/attendance");

    let response = app.get("/list", Some(&cookie)).await;
    assert_eq!(location(&response), "/admin");
}
