// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side sessions and the session cookie.
//!
//! The cookie value is `token.tag`, where `tag` is an HMAC of the token
//! under the session secret. The store only ever sees the SHA-256 of the
//! token, so a leaked sessions collection can't be replayed.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::Config;
use crate::db::SessionStore;
use crate::error::AppError;
use crate::models::Session;
use crate::services::token;
use crate::time_utils::format_utc_rfc3339;

pub const SESSION_COOKIE: &str = "tradedesk_session";

/// Creates, resolves and destroys sessions.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    secret: Arc<Vec<u8>>,
    ttl: Duration,
    secure_cookies: bool,
}

fn storage_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, config: &Config) -> Self {
        Self {
            store,
            secret: Arc::new(config.session_secret.clone()),
            ttl: Duration::try_hours(config.session_ttl_hours).unwrap_or(Duration::MAX),
            secure_cookies: config.secure_cookies(),
        }
    }

    /// Start a session for `user_id` and return its token.
    pub async fn create(&self, user_id: &str) -> Result<String, AppError> {
        let token = token::random_token()?;
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session expiry out of range"))
        })?;
        let session = Session {
            user_id: user_id.to_string(),
            created_at: format_utc_rfc3339(now),
            expires_at: format_utc_rfc3339(expires_at),
        };

        self.store.put_session(&storage_key(&token), &session).await?;
        tracing::debug!(user_id, "Session created");
        Ok(token)
    }

    /// Map a token to its user ID. Expired sessions are deleted and
    /// resolve to `None`.
    pub async fn resolve(&self, token: &str) -> Result<Option<String>, AppError> {
        let key = storage_key(token);
        let Some(session) = self.store.get_session(&key).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            tracing::debug!(user_id = %session.user_id, "Session expired");
            self.store.delete_session(&key).await?;
            return Ok(None);
        }

        Ok(Some(session.user_id))
    }

    pub async fn destroy(&self, token: &str) -> Result<(), AppError> {
        self.store.delete_session(&storage_key(token)).await
    }

    pub async fn purge_expired(&self) -> Result<usize, AppError> {
        self.store.purge_expired(Utc::now()).await
    }

    /// Cookie payload for a token.
    pub fn cookie_value(&self, token: &str) -> Result<String, AppError> {
        Ok(format!("{}.{}", token, token::sign(&self.secret, token)?))
    }

    /// Recover the token from a cookie payload, if its tag is valid.
    pub fn token_from_cookie(&self, value: &str) -> Option<String> {
        let (token, tag) = value.rsplit_once('.')?;
        if token.is_empty() || !token::verify(&self.secret, token, tag) {
            return None;
        }
        Some(token.to_string())
    }

    /// Session cookie carrying `token`.
    pub fn session_cookie(&self, token: &str) -> Result<Cookie<'static>, AppError> {
        let mut cookie = self.base_cookie(self.cookie_value(token)?);
        cookie.set_max_age(time::Duration::seconds(self.ttl.num_seconds()));
        Ok(cookie)
    }

    /// Cookie matching the session cookie's attributes, for removal.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.base_cookie(String::new())
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .build()
    }
}
