//! Server-side sessions and flash messages
//!
//! The browser only holds `trackr_session=<id>.<signature>`; the admin flag
//! and pending flash messages stay in process memory. Sessions expire after
//! 12 hours without a request.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use trackr_common::Clock;

use crate::AppState;

pub const SESSION_COOKIE: &str = "trackr_session";

/// Inactivity after which a session is forgotten
pub const SESSION_IDLE_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Danger,
    Warning,
    Info,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Danger => "danger",
            FlashLevel::Warning => "warning",
            FlashLevel::Info => "info",
        }
    }
}

/// One-shot message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

struct SessionData {
    admin: bool,
    flashes: Vec<Flash>,
    last_access: DateTime<Utc>,
}

/// In-memory session table
pub struct SessionStore {
    secret: String,
    clock: Arc<dyn Clock>,
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl SessionStore {
    /// Create a store; without a configured secret a random one is used,
    /// so sessions do not survive a restart
    pub fn new(secret: Option<String>, clock: Arc<dyn Clock>) -> Self {
        let secret = secret.unwrap_or_else(|| {
            warn!("No session secret configured; generated a random one for this process");
            random_hex(32)
        });
        Self {
            secret,
            clock,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sign(&self, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(id.as_bytes());
        hasher.update(self.secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Cookie value for a session id
    pub fn cookie_value(&self, id: &str) -> String {
        format!("{}.{}", id, self.sign(id))
    }

    /// Session id from a cookie value, if the signature matches
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (id, signature) = cookie_value.split_once('.')?;
        (!id.is_empty() && self.sign(id) == signature).then(|| id.to_string())
    }

    /// Start a new anonymous session
    pub fn create(&self) -> String {
        let id = random_hex(16);
        let now = self.clock.now();
        let mut sessions = self.lock();
        sessions.retain(|_, data| !is_expired(data, now));
        sessions.insert(
            id.clone(),
            SessionData {
                admin: false,
                flashes: Vec::new(),
                last_access: now,
            },
        );
        id
    }

    /// Refresh a live session; false when it is unknown or expired
    pub fn touch(&self, id: &str) -> bool {
        let now = self.clock.now();
        let mut sessions = self.lock();
        match sessions.get_mut(id) {
            Some(data) if !is_expired(data, now) => {
                data.last_access = now;
                true
            }
            Some(_) => {
                sessions.remove(id);
                debug!("Session expired");
                false
            }
            None => false,
        }
    }

    pub fn is_admin(&self, id: &str) -> bool {
        self.lock().get(id).map(|d| d.admin).unwrap_or(false)
    }

    pub fn set_admin(&self, id: &str, admin: bool) {
        if let Some(data) = self.lock().get_mut(id) {
            data.admin = admin;
        }
    }

    pub fn push_flash(&self, id: &str, level: FlashLevel, message: impl Into<String>) {
        if let Some(data) = self.lock().get_mut(id) {
            data.flashes.push(Flash {
                level,
                message: message.into(),
            });
        }
    }

    /// Pending flashes, cleared by this call
    pub fn take_flashes(&self, id: &str) -> Vec<Flash> {
        self.lock()
            .get_mut(id)
            .map(|d| std::mem::take(&mut d.flashes))
            .unwrap_or_default()
    }

    /// Drop the admin flag and any pending messages
    pub fn clear(&self, id: &str) {
        if let Some(data) = self.lock().get_mut(id) {
            data.admin = false;
            data.flashes.clear();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionData>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn is_expired(data: &SessionData, now: DateTime<Utc>) -> bool {
    now - data.last_access > Duration::hours(SESSION_IDLE_HOURS)
}

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Handle to the current request's session
#[derive(Clone)]
pub struct Session {
    id: String,
    store: Arc<SessionStore>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_admin(&self) -> bool {
        self.store.is_admin(&self.id)
    }

    pub fn set_admin(&self, admin: bool) {
        self.store.set_admin(&self.id, admin);
    }

    pub fn flash(&self, level: FlashLevel, message: impl Into<String>) {
        self.store.push_flash(&self.id, level, message);
    }

    pub fn take_flashes(&self) -> Vec<Flash> {
        self.store.take_flashes(&self.id)
    }

    pub fn clear(&self) {
        self.store.clear(&self.id);
    }
}

/// Value of the session cookie in a request, if any
fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// Attach a [`Session`] to every request
///
/// A missing, forged or expired cookie starts a new session and the response
/// carries the new cookie.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let store = Arc::clone(&state.sessions);
    let existing = session_cookie(request.headers())
        .and_then(|value| store.verify(value))
        .filter(|id| store.touch(id));

    let (id, is_new) = match existing {
        Some(id) => (id, false),
        None => (store.create(), true),
    };

    request.extensions_mut().insert(Session {
        id: id.clone(),
        store: Arc::clone(&store),
    });

    let mut response = next.run(request).await;

    if is_new {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            store.cookie_value(&id)
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Failed to build session cookie: {}", e),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trackr_common::time::FixedClock;

    fn store_with_clock() -> (SessionStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap(),
        ));
        let store = SessionStore::new(Some("secret".to_string()), clock.clone());
        (store, clock)
    }

    #[test]
    fn test_cookie_signature_verified() {
        let (store, _) = store_with_clock();
        let id = store.create();
        let value = store.cookie_value(&id);
        assert_eq!(store.verify(&value), Some(id.clone()));

        let forged = format!("{}.{}", id, "0".repeat(64));
        assert_eq!(store.verify(&forged), None);
        assert_eq!(store.verify("no-signature"), None);
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let (store, clock) = store_with_clock();
        let other = SessionStore::new(Some("other".to_string()), clock);
        let id = store.create();
        assert_eq!(other.verify(&store.cookie_value(&id)), None);
    }

    #[test]
    fn test_flashes_shown_once() {
        let (store, _) = store_with_clock();
        let id = store.create();
        store.push_flash(&id, FlashLevel::Success, "Saved");
        store.push_flash(&id, FlashLevel::Danger, "Oops");

        let flashes = store.take_flashes(&id);
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[1].level, FlashLevel::Danger);
        assert!(store.take_flashes(&id).is_empty());
    }

    #[test]
    fn test_admin_flag_and_clear() {
        let (store, _) = store_with_clock();
        let id = store.create();
        assert!(!store.is_admin(&id));
        store.set_admin(&id, true);
        assert!(store.is_admin(&id));
        store.clear(&id);
        assert!(!store.is_admin(&id));
    }

    #[test]
    fn test_session_expires_after_idle_period() {
        let (store, clock) = store_with_clock();
        let id = store.create();
        store.set_admin(&id, true);

        clock.advance(Duration::hours(11));
        assert!(store.touch(&id));

        clock.advance(Duration::hours(SESSION_IDLE_HOURS) + Duration::minutes(1));
        assert!(!store.touch(&id));
        assert!(!store.is_admin(&id));
    }

    #[test]
    fn test_cookie_header_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; trackr_session=abc.def"),
        );
        assert_eq!(session_cookie(&headers), Some("abc.def"));
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }
}
