// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and pages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Opaque identifier (also used as document ID)
    pub id: String,
    /// Display name entered at registration
    pub full_name: Option<String>,
    /// Contact phone number
    pub phone_number: Option<String>,
    /// How the user signs in
    pub account: Account,
    /// When the user was created (RFC3339)
    pub created_at: String,
}

/// Sign-in method for a user. Exactly one per user.
#[derive(Clone, PartialEq, Eq)]
pub enum Account {
    /// Registered with username and password.
    Local {
        username: String,
        /// Argon2 PHC string
        password_hash: String,
    },
    /// Created on first Google sign-in.
    Google(GoogleAccount),
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::Local { username, .. } => f
                .debug_struct("Local")
                .field("username", username)
                .field("password_hash", &"<redacted>")
                .finish(),
            Account::Google(google) => f.debug_tuple("Google").field(google).finish(),
        }
    }
}

/// Profile fields copied from the Google ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleAccount {
    /// Stable Google subject identifier
    pub google_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// The unique key a user signs in with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoginKey {
    Username(String),
    GoogleId(String),
}

impl LoginKey {
    /// Stable string form, safe to use as a document ID.
    pub fn storage_key(&self) -> String {
        match self {
            LoginKey::Username(username) => format!("local:{}", urlencoding::encode(username)),
            LoginKey::GoogleId(sub) => format!("google:{}", urlencoding::encode(sub)),
        }
    }
}

impl User {
    pub fn login_key(&self) -> LoginKey {
        match &self.account {
            Account::Local { username, .. } => LoginKey::Username(username.clone()),
            Account::Google(google) => LoginKey::GoogleId(google.google_id.clone()),
        }
    }

    /// Name shown in page headers.
    ///
    /// Prefers the full name, then the Google display name, then the
    /// username, then a generic fallback.
    pub fn greeting_name(&self) -> &str {
        if let Some(name) = non_empty(&self.full_name) {
            return name;
        }
        match &self.account {
            Account::Google(google) => non_empty(&google.display_name)
                .or_else(|| non_empty(&google.first_name))
                .unwrap_or("User"),
            Account::Local { username, .. } if !username.is_empty() => username.as_str(),
            Account::Local { .. } => "User",
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

const KIND_LOCAL: &str = "local";
const KIND_GOOGLE: &str = "google";

/// Flat Firestore representation of a [`User`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    pub id: String,
    /// "local" or "google"
    pub kind: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub created_at: String,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        let mut doc = UserDocument {
            id: user.id.clone(),
            kind: String::new(),
            full_name: user.full_name.clone(),
            phone_number: user.phone_number.clone(),
            username: None,
            password_hash: None,
            google_id: None,
            email: None,
            display_name: None,
            first_name: None,
            last_name: None,
            created_at: user.created_at.clone(),
        };

        match &user.account {
            Account::Local {
                username,
                password_hash,
            } => {
                doc.kind = KIND_LOCAL.to_string();
                doc.username = Some(username.clone());
                doc.password_hash = Some(password_hash.clone());
            }
            Account::Google(google) => {
                doc.kind = KIND_GOOGLE.to_string();
                doc.google_id = Some(google.google_id.clone());
                doc.email = google.email.clone();
                doc.display_name = google.display_name.clone();
                doc.first_name = google.first_name.clone();
                doc.last_name = google.last_name.clone();
            }
        }

        doc
    }
}

/// Error for documents that don't describe exactly one account kind.
#[derive(Debug, thiserror::Error)]
#[error("malformed user document {id}: {reason}")]
pub struct MalformedUser {
    pub id: String,
    pub reason: &'static str,
}

impl TryFrom<UserDocument> for User {
    type Error = MalformedUser;

    fn try_from(doc: UserDocument) -> Result<Self, Self::Error> {
        let malformed = |reason| MalformedUser {
            id: doc.id.clone(),
            reason,
        };

        let account = match doc.kind.as_str() {
            KIND_LOCAL => {
                if doc.google_id.is_some() {
                    return Err(malformed("local account carries google_id"));
                }
                Account::Local {
                    username: doc.username.clone().ok_or_else(|| malformed("missing username"))?,
                    password_hash: doc
                        .password_hash
                        .clone()
                        .ok_or_else(|| malformed("missing password_hash"))?,
                }
            }
            KIND_GOOGLE => {
                if doc.username.is_some() || doc.password_hash.is_some() {
                    return Err(malformed("google account carries local credentials"));
                }
                Account::Google(GoogleAccount {
                    google_id: doc.google_id.clone().ok_or_else(|| malformed("missing google_id"))?,
                    email: doc.email.clone(),
                    display_name: doc.display_name.clone(),
                    first_name: doc.first_name.clone(),
                    last_name: doc.last_name.clone(),
                })
            }
            _ => return Err(malformed("unknown account kind")),
        };

        Ok(User {
            id: doc.id,
            full_name: doc.full_name,
            phone_number: doc.phone_number,
            account,
            created_at: doc.created_at,
        })
    }
}
