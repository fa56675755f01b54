// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tradedesk::config::Config;
use tradedesk::db::{FirestoreDb, MemoryStore, SessionStore, UserStore};
use tradedesk::error::AppError;
use tradedesk::routes::create_router;
use tradedesk::services::{AccountService, IdentityProvider, OAuthProfile, SessionService};
use tradedesk::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Identity provider that answers from a fixed table of codes.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeIdentityProvider {
    profiles: Mutex<HashMap<String, OAuthProfile>>,
    exchanges: AtomicUsize,
}

#[allow(dead_code)]
impl FakeIdentityProvider {
    /// Make `code` exchange for `profile`.
    pub fn accept(&self, code: &str, profile: OAuthProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(code.to_string(), profile);
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        format!(
            "https://accounts.example.test/auth?state={}&nonce={}",
            urlencoding::encode(state),
            urlencoding::encode(nonce)
        )
    }

    async fn exchange_code(&self, code: &str, _nonce: &str) -> Result<OAuthProfile, AppError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| AppError::ProviderError(format!("unknown code {}", code)))
    }
}

/// Everything a test needs to drive the app and inspect its state.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<FakeIdentityProvider>,
}

#[allow(dead_code)]
fn build_state(
    config: Config,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    identity: Arc<FakeIdentityProvider>,
) -> Arc<AppState> {
    Arc::new(AppState {
        accounts: AccountService::new(users),
        sessions: SessionService::new(sessions, &config),
        identity,
        config,
    })
}

/// Create a test app backed by the in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_public_url(public_url: &str) -> TestApp {
    let mut config = Config::test_default();
    config.public_url = public_url.to_string();
    create_test_app_with_config(config)
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let identity = Arc::new(FakeIdentityProvider::default());
    let state = build_state(config, store.clone(), store.clone(), identity.clone());

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        identity,
    }
}

/// Create a test app whose store is offline; every store call fails.
#[allow(dead_code)]
pub fn create_test_app_offline() -> (Router, Arc<AppState>) {
    let db = Arc::new(FirestoreDb::new_mock());
    let identity = Arc::new(FakeIdentityProvider::default());
    let state = build_state(Config::test_default(), db.clone(), db, identity);
    (create_router(state.clone()), state)
}

#[allow(dead_code)]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
}

/// `name=value` part of a Set-Cookie header, ready for a Cookie header.
#[allow(dead_code)]
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

#[allow(dead_code)]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Register a local account and return the response.
#[allow(dead_code)]
pub async fn register(app: &Router, username: &str, password: &str) -> Response {
    use tower::ServiceExt;

    let body = format!(
        "fullName=Test+Trader&username={}&phoneNumber=555-0100&password={}",
        urlencoding::encode(username),
        urlencoding::encode(password)
    );
    app.clone()
        .oneshot(post_form("/register", &body, None))
        .await
        .unwrap()
}

/// Log in and return the response.
#[allow(dead_code)]
pub async fn login(app: &Router, username: &str, password: &str) -> Response {
    use tower::ServiceExt;

    let body = format!(
        "username={}&password={}",
        urlencoding::encode(username),
        urlencoding::encode(password)
    );
    app.clone()
        .oneshot(post_form("/login", &body, None))
        .await
        .unwrap()
}

/// Register, log in and return the session Cookie header value.
#[allow(dead_code)]
pub async fn signed_in_cookie(app: &Router, username: &str, password: &str) -> String {
    register(app, username, password).await;
    let response = login(app, username, password).await;
    let cookies = set_cookie_headers(&response);
    cookie_pair(&find_cookie(&cookies, "tradedesk_session").expect("no session cookie"))
}
