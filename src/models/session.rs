// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side session record.

use crate::time_utils::parse_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session, keyed by its random token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// ID of the signed-in user
    pub user_id: String,
    /// When the session was created (RFC3339)
    pub created_at: String,
    /// When the session stops being valid (RFC3339)
    pub expires_at: String,
}

impl Session {
    /// An unparseable expiry counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match parse_utc_rfc3339(&self.expires_at) {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }
}
