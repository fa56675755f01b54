// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware (the access gate).

use crate::models::User;
use crate::services::session::SESSION_COOKIE;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Where anonymous requests to protected pages are sent.
pub const LOGIN_PATH: &str = "/login";

/// Authenticated user, inserted into request extensions by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Result of checking a request's session.
#[derive(Debug, Clone)]
pub enum Access {
    Authenticated(CurrentUser),
    Anonymous,
}

impl Access {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Access::Authenticated(_))
    }
}

/// Session token from the request cookie, if its signature checks out.
pub fn session_token(state: &AppState, jar: &CookieJar) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    state.sessions.token_from_cookie(cookie.value())
}

/// Decide whether the request belongs to a signed-in user.
///
/// Every failure (no cookie, bad signature, unknown or expired session,
/// store error, deleted user) is treated as anonymous.
pub async fn evaluate(state: &AppState, jar: &CookieJar) -> Access {
    let Some(token) = session_token(state, jar) else {
        return Access::Anonymous;
    };

    let user_id = match state.sessions.resolve(&token).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return Access::Anonymous,
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed, treating request as anonymous");
            return Access::Anonymous;
        }
    };

    match state.accounts.get_user(&user_id).await {
        Ok(Some(user)) => Access::Authenticated(CurrentUser(user)),
        Ok(None) => {
            tracing::warn!(user_id = %user_id, "Session refers to missing user");
            Access::Anonymous
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "User lookup failed, treating request as anonymous");
            Access::Anonymous
        }
    }
}

/// Middleware that requires a valid session.
///
/// Anonymous requests are redirected to the login page and never reach the
/// handler.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match evaluate(&state, &jar).await {
        Access::Authenticated(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Access::Anonymous => {
            tracing::debug!(path = %request.uri().path(), "Redirecting anonymous request to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{MemoryStore, UserStore};
    use crate::error::AppError;
    use crate::models::Account;
    use crate::services::{AccountService, IdentityProvider, OAuthProfile, SessionService};
    use async_trait::async_trait;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt; // for oneshot

    struct NoProvider;

    #[async_trait]
    impl IdentityProvider for NoProvider {
        fn authorization_url(&self, _state: &str, _nonce: &str) -> String {
            String::new()
        }

        async fn exchange_code(&self, _code: &str, _nonce: &str) -> Result<OAuthProfile, AppError> {
            Err(AppError::ProviderError("not configured".to_string()))
        }
    }

    fn gated_app(hits: Arc<AtomicUsize>) -> (Router, Arc<AppState>, Arc<MemoryStore>) {
        let config = Config::test_default();
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState {
            accounts: AccountService::new(store.clone()),
            sessions: SessionService::new(store.clone(), &config),
            identity: Arc::new(NoProvider),
            config,
        });

        let router = Router::new()
            .route(
                "/guarded",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "inside"
                    }
                }),
            )
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_session,
            ))
            .with_state(state.clone());

        (router, state, store)
    }

    fn request(cookie: Option<String>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/guarded");
        if let Some(cookie) = cookie {
            builder = builder.header(axum::http::header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn anonymous_request_never_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (router, state, _) = gated_app(hits.clone());

        let response = router.clone().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), LOGIN_PATH);

        // A well-signed cookie for a session that doesn't exist is no better.
        let forged = state.sessions.cookie_value("unknown-token").unwrap();
        let response = router
            .oneshot(request(Some(format!("{}={}", SESSION_COOKIE, forged))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn live_session_runs_handler_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (router, state, store) = gated_app(hits.clone());

        let user = User {
            id: "u1".to_string(),
            full_name: None,
            phone_number: None,
            account: Account::Local {
                username: "trader@example.com".to_string(),
                password_hash: "unused".to_string(),
            },
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        store.create_user(&user).await.unwrap();
        let token = state.sessions.create(&user.id).await.unwrap();
        let value = state.sessions.cookie_value(&token).unwrap();

        let response = router
            .oneshot(request(Some(format!("{}={}", SESSION_COOKIE, value))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
