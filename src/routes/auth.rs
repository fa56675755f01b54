// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: registration, password login, Google OAuth and
//! logout.

use axum::{
    extract::{rejection::FormRejection, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::{session_token, LOGIN_PATH};
use crate::models::User;
use crate::services::oauth::{self, OAUTH_NONCE_COOKIE, STATE_MAX_AGE_MILLIS};
use crate::services::{token, Registration};
use crate::AppState;

const GOOGLE_CALLBACK_PATH: &str = "/auth/google/callback";
/// Landing page after Google sign-in.
const OAUTH_SUCCESS_PATH: &str = "/secrets";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/auth/google", get(google_start))
        .route(GOOGLE_CALLBACK_PATH, get(google_callback))
}

/// Inline alert followed by a client-side redirect.
fn alert_and_redirect(message: &str, location: &str) -> Html<String> {
    Html(format!(
        "<script>alert('{}'); window.location.href='{}';</script>",
        message, location
    ))
}

/// Create a local account, then send the user to the login form.
async fn register(
    State(state): State<Arc<AppState>>,
    form: std::result::Result<Form<Registration>, FormRejection>,
) -> Redirect {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            tracing::info!(error = %rejection, "Registration rejected: unreadable form");
            return Redirect::to("/register");
        }
    };

    match state.accounts.register(form).await {
        Ok(_) => Redirect::to(LOGIN_PATH),
        Err(AppError::Conflict(key)) => {
            tracing::info!(key = %key, "Registration rejected: username taken");
            Redirect::to("/register")
        }
        Err(AppError::BadRequest(reason)) => {
            tracing::info!(reason = %reason, "Registration rejected: invalid form");
            Redirect::to("/register")
        }
        Err(e) => {
            tracing::error!(error = %e, "Registration failed");
            Redirect::to("/register")
        }
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// Start a fresh session for `user`, replacing any session the browser
/// already carries.
async fn establish_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar> {
    if let Some(old) = session_token(state, &jar) {
        if let Err(e) = state.sessions.destroy(&old).await {
            tracing::warn!(error = %e, "Failed to destroy previous session");
        }
    }

    let token = state.sessions.create(&user.id).await?;
    Ok(jar.add(state.sessions.session_cookie(&token)?))
}

/// Password login.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    form: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            tracing::info!(error = %rejection, "Login rejected: unreadable form");
            return Redirect::to(LOGIN_PATH).into_response();
        }
    };

    let result = match state
        .accounts
        .verify_credentials(&form.username, &form.password)
        .await
    {
        Ok(user) => establish_session(&state, jar, &user)
            .await
            .map(|jar| (user, jar)),
        Err(e) => Err(e),
    };

    match result {
        Ok((user, jar)) => {
            tracing::info!(user_id = %user.id, "Password login succeeded");
            (jar, Redirect::to("/")).into_response()
        }
        Err(AppError::BadCredential) => {
            alert_and_redirect("Incorrect password!", LOGIN_PATH).into_response()
        }
        Err(AppError::NotFound(_)) => {
            alert_and_redirect("User not found! Please register.", "/register").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

/// Destroy the session and clear the cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(token) = session_token(&state, &jar) {
        if let Err(e) = state.sessions.destroy(&token).await {
            tracing::error!(error = %e, "Failed to destroy session on logout");
        }
    }

    (
        jar.remove(state.sessions.removal_cookie()),
        Redirect::to("/"),
    )
}

fn nonce_cookie(state: &AppState, value: String) -> Cookie<'static> {
    Cookie::build((OAUTH_NONCE_COOKIE, value))
        .path(GOOGLE_CALLBACK_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies())
        .max_age(time::Duration::milliseconds(STATE_MAX_AGE_MILLIS as i64))
        .build()
}

/// Start OAuth flow - redirect to Google.
async fn google_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let nonce = token::random_token()?;
    let oauth_state = oauth::sign_state(&state.config.session_secret, &nonce, oauth::now_millis()?)?;
    let auth_url = state.identity.authorization_url(&oauth_state, &nonce);

    tracing::info!("Starting OAuth flow, redirecting to Google");

    Ok((
        jar.add(nonce_cookie(&state, nonce)),
        Redirect::temporary(&auth_url),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Verify the callback, find or create the user and start a session.
async fn complete_google_login(
    state: &AppState,
    jar: CookieJar,
    params: CallbackParams,
) -> Result<(User, CookieJar)> {
    if let Some(error) = params.error {
        return Err(AppError::ProviderError(format!("authorization denied: {}", error)));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| AppError::InvalidState("missing state".to_string()))?;
    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("missing code".to_string()))?;

    let nonce = oauth::verify_state(&state.config.session_secret, &oauth_state, oauth::now_millis()?)?;

    let cookie_nonce = jar
        .get(OAUTH_NONCE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::InvalidState("missing nonce cookie".to_string()))?;
    if !bool::from(cookie_nonce.as_bytes().ct_eq(nonce.as_bytes())) {
        return Err(AppError::InvalidState("nonce cookie mismatch".to_string()));
    }

    let profile = state.identity.exchange_code(&code, &nonce).await?;
    let (user, created) = state.accounts.find_or_create_oauth_user(profile).await?;

    tracing::info!(user_id = %user.id, created, "Google sign-in succeeded");

    let jar = establish_session(state, jar, &user).await?;
    Ok((user, jar))
}

/// OAuth callback. Every failure lands on the login page.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let nonce_removal = nonce_cookie(&state, String::new());

    match complete_google_login(&state, jar.clone(), params).await {
        Ok((_, jar)) => (jar.remove(nonce_removal), Redirect::to(OAUTH_SUCCESS_PATH)),
        Err(e) => {
            match &e {
                AppError::InvalidState(_) | AppError::BadRequest(_) => {
                    tracing::warn!(error = %e, "Rejected OAuth callback")
                }
                _ => tracing::error!(error = %e, "OAuth callback failed"),
            }
            (jar.remove(nonce_removal), Redirect::to(LOGIN_PATH))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_script_redirects() {
        let Html(body) = alert_and_redirect("Incorrect password!", "/login");
        assert_eq!(
            body,
            "<script>alert('Incorrect password!'); window.location.href='/login';</script>"
        );
    }
}
