// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and password login tests.

use axum::http::StatusCode;
use tower::ServiceExt;
use tradedesk::db::UserStore;
use tradedesk::models::LoginKey;

mod common;
use common::{
    body_string, cookie_pair, create_test_app, find_cookie, location, login, post_form, register,
    set_cookie_headers,
};

#[tokio::test]
async fn test_register_then_login_starts_session() {
    let app = create_test_app();

    let response = register(&app.router, "trader@example.com", "hunter2").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert_eq!(app.store.user_count(), 1);

    let response = login(&app.router, "trader@example.com", "hunter2").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let cookies = set_cookie_headers(&response);
    let session = find_cookie(&cookies, "tradedesk_session").expect("session cookie");
    assert!(session.contains("HttpOnly"));
    assert_eq!(app.store.session_count(), 1);

    // The new session opens the dashboard.
    let response = app
        .router
        .clone()
        .oneshot(common::get("/", Some(&cookie_pair(&session))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Welcome, Test Trader"));
}

#[tokio::test]
async fn test_registration_stores_hashed_password_and_profile() {
    let app = create_test_app();
    register(&app.router, "  padded@example.com ", "s3cret").await;

    let user = app
        .store
        .find_by_login_key(&LoginKey::Username("padded@example.com".to_string()))
        .await
        .unwrap()
        .expect("user stored under trimmed username");

    assert_eq!(user.full_name.as_deref(), Some("Test Trader"));
    assert_eq!(user.phone_number.as_deref(), Some("555-0100"));
    match &user.account {
        tradedesk::models::Account::Local { password_hash, .. } => {
            assert!(password_hash.starts_with("$argon2"));
            assert!(!password_hash.contains("s3cret"));
        }
        other => panic!("expected local account, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_password_alerts_without_session() {
    let app = create_test_app();
    register(&app.router, "trader@example.com", "right").await;

    let response = login(&app.router, "trader@example.com", "wrong").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(find_cookie(&set_cookie_headers(&response), "tradedesk_session").is_none());

    let body = body_string(response).await;
    assert!(body.contains("alert('Incorrect password!')"));
    assert!(body.contains("window.location.href='/login'"));
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn test_unknown_user_is_sent_to_register() {
    let app = create_test_app();

    let response = login(&app.router, "nobody@example.com", "whatever").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(find_cookie(&set_cookie_headers(&response), "tradedesk_session").is_none());

    let body = body_string(response).await;
    assert!(body.contains("alert('User not found! Please register.')"));
    assert!(body.contains("window.location.href='/register'"));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = create_test_app();

    register(&app.router, "trader@example.com", "first").await;
    let response = register(&app.router, "trader@example.com", "second").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
    assert_eq!(app.store.user_count(), 1);

    // The original password still works; the second one never took.
    let response = login(&app.router, "trader@example.com", "first").await;
    assert_eq!(location(&response), "/");
    let response = login(&app.router, "trader@example.com", "second").await;
    assert!(body_string(response).await.contains("Incorrect password!"));
}

#[tokio::test]
async fn test_registration_without_password_is_rejected() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(post_form(
            "/register",
            "username=trader%40example.com&password=",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
    assert_eq!(app.store.user_count(), 0);
}

#[tokio::test]
async fn test_store_outage_redirects_to_login() {
    let (router, _) = common::create_test_app_offline();

    let response = login(&router, "trader@example.com", "hunter2").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert!(find_cookie(&set_cookie_headers(&response), "tradedesk_session").is_none());

    let response = register(&router, "trader@example.com", "hunter2").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
}

#[tokio::test]
async fn test_forms_are_public() {
    let app = create_test_app();

    for path in ["/login", "/register"] {
        let response = app
            .router
            .clone()
            .oneshot(common::get(path, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let body = body_string(response).await;
        assert!(body.contains(&format!("action=\"{path}\"")), "{path}");
    }
}

#[tokio::test]
async fn test_incomplete_forms_redirect_instead_of_erroring() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(post_form("/register", "password=p1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
    assert_eq!(app.store.user_count(), 0);

    let response = app
        .router
        .clone()
        .oneshot(post_form("/login", "username=a%40x.com", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert!(find_cookie(&set_cookie_headers(&response), "tradedesk_session").is_none());
}

#[tokio::test]
async fn test_unusable_session_lifetime_fails_login_gracefully() {
    let mut config = tradedesk::config::Config::test_default();
    config.session_ttl_hours = 3_000_000_000;
    let app = common::create_test_app_with_config(config);
    register(&app.router, "trader@example.com", "hunter2").await;

    let response = login(&app.router, "trader@example.com", "hunter2").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert!(find_cookie(&set_cookie_headers(&response), "tradedesk_session").is_none());
    assert_eq!(app.store.session_count(), 0);
}
