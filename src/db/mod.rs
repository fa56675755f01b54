// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: store traits plus Firestore and in-memory backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{LoginKey, Session, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Login key -> user ID index (keyed by `LoginKey::storage_key`)
    pub const USER_KEYS: &str = "user_keys";
    /// Sessions keyed by the SHA-256 of the session token
    pub const SESSIONS: &str = "sessions";
}

/// Persistent user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by ID.
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Find the user that signs in with `key`.
    async fn find_by_login_key(&self, key: &LoginKey) -> Result<Option<User>, AppError>;

    /// Insert a new user.
    ///
    /// Returns `AppError::Conflict` if another user already holds the same
    /// login key.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;
}

/// Server-side session records, keyed by an opaque lookup key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put_session(&self, key: &str, session: &Session) -> Result<(), AppError>;

    async fn get_session(&self, key: &str) -> Result<Option<Session>, AppError>;

    /// Delete a session. Deleting a missing session is not an error.
    async fn delete_session(&self, key: &str) -> Result<(), AppError>;

    /// Remove sessions that expired before `now`. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}
