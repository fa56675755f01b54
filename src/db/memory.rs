// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.

use super::{SessionStore, UserStore};
use crate::error::AppError;
use crate::models::{LoginKey, Session, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Users and sessions held in concurrent maps. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    login_keys: DashMap<LoginKey, String>,
    sessions: DashMap<String, Session>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_by_login_key(&self, key: &LoginKey) -> Result<Option<User>, AppError> {
        let Some(user_id) = self.login_keys.get(key).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        // The entry guard is held until the user is inserted, so a
        // concurrent lookup never sees a key without its user.
        match self.login_keys.entry(user.login_key()) {
            Entry::Occupied(_) => Err(AppError::Conflict(user.login_key().storage_key())),
            Entry::Vacant(slot) => {
                self.users.insert(user.id.clone(), user.clone());
                slot.insert(user.id.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put_session(&self, key: &str, session: &Session) -> Result<(), AppError> {
        self.sessions.insert(key.to_string(), session.clone());
        Ok(())
    }

    async fn get_session(&self, key: &str) -> Result<Option<Session>, AppError> {
        Ok(self.sessions.get(key).map(|s| s.clone()))
    }

    async fn delete_session(&self, key: &str) -> Result<(), AppError> {
        self.sessions.remove(key);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
