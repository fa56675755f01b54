// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration, credential checks and OAuth user provisioning.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{Account, GoogleAccount, LoginKey, User};
use crate::services::oauth::OAuthProfile;
use crate::services::password::{hash_password_blocking, verify_password_blocking};
use crate::services::token;
use crate::time_utils::format_utc_rfc3339;

/// Registration form as submitted by `/register`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 3, max = 254))]
    pub username: String,
    #[serde(rename = "fullName", default)]
    #[validate(length(max = 200))]
    pub full_name: Option<String>,
    #[serde(rename = "phoneNumber", default)]
    #[validate(length(max = 40))]
    pub phone_number: Option<String>,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

/// Empty form fields arrive as "", store them as absent.
fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.users.get_user(id).await
    }

    /// Create a local account. Fails with `Conflict` if the username is taken.
    pub async fn register(&self, form: Registration) -> Result<User, AppError> {
        let form = Registration {
            username: form.username.trim().to_string(),
            full_name: blank_to_none(form.full_name),
            phone_number: blank_to_none(form.phone_number),
            password: form.password,
        };
        form.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let password_hash = hash_password_blocking(form.password).await?;

        let user = User {
            id: token::random_id()?,
            full_name: form.full_name,
            phone_number: form.phone_number,
            account: Account::Local {
                username: form.username,
                password_hash,
            },
            created_at: format_utc_rfc3339(Utc::now()),
        };

        self.users.create_user(&user).await?;
        tracing::info!(user_id = %user.id, "Local account registered");
        Ok(user)
    }

    /// Check a username/password pair.
    ///
    /// Unknown username is `NotFound`; a wrong password, or a username that
    /// belongs to no local account, is `BadCredential`.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<User, AppError> {
        let username = username.trim();
        let user = self
            .users
            .find_by_login_key(&LoginKey::Username(username.to_string()))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", username)))?;

        let Account::Local { password_hash, .. } = &user.account else {
            return Err(AppError::BadCredential);
        };

        if verify_password_blocking(password.to_string(), password_hash.clone()).await? {
            Ok(user)
        } else {
            tracing::info!(user_id = %user.id, "Rejected login: incorrect password");
            Err(AppError::BadCredential)
        }
    }

    /// Find the user for a provider identity, creating it on first sign-in.
    /// Returns the user and whether it was just created.
    pub async fn find_or_create_oauth_user(
        &self,
        profile: OAuthProfile,
    ) -> Result<(User, bool), AppError> {
        let key = LoginKey::GoogleId(profile.subject.clone());
        if let Some(user) = self.users.find_by_login_key(&key).await? {
            return Ok((user, false));
        }

        let user = User {
            id: token::random_id()?,
            full_name: None,
            phone_number: None,
            account: Account::Google(GoogleAccount {
                google_id: profile.subject,
                email: profile.email,
                display_name: profile.display_name,
                first_name: profile.first_name,
                last_name: profile.last_name,
            }),
            created_at: format_utc_rfc3339(Utc::now()),
        };

        match self.users.create_user(&user).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "Google account created");
                Ok((user, true))
            }
            // Lost a race with a concurrent callback for the same subject
            Err(AppError::Conflict(_)) => {
                let existing = self.users.find_by_login_key(&key).await?.ok_or_else(|| {
                    AppError::StoreUnavailable("login key claimed but user missing".to_string())
                })?;
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }
}
