// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. A `.env` file is honored for local
//! development.

use std::env;

/// Minimum length of the session secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
/// One year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Which persistence backend to use for users and sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Cloud Firestore (production).
    Firestore,
    /// Process-local maps; data is lost on restart.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid(
                "STORE_BACKEND",
                format!("expected 'firestore' or 'memory', got '{}'", other),
            )),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Externally visible base URL, used to build the OAuth callback URL
    pub public_url: String,
    /// GCP project holding the Firestore database
    pub gcp_project_id: String,
    /// Persistence backend
    pub store_backend: StoreBackend,
    /// Server port
    pub port: u16,
    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Key for session cookie and OAuth state signatures (raw bytes)
    pub session_secret: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| ConfigError::Missing("SESSION_SECRET"))?
            .into_bytes();
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET",
                format!("must be at least {} bytes", MIN_SESSION_SECRET_LEN),
            ));
        }

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(raw) => parse_session_ttl_hours(&raw)?,
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            public_url: env::var("PUBLIC_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            store_backend: env::var("STORE_BACKEND")
                .map(|v| v.parse())
                .unwrap_or(Ok(StoreBackend::Firestore))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            session_ttl_hours,

            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            session_secret,
        })
    }

    /// Default config for tests: memory backend, fixed secrets.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            public_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            store_backend: StoreBackend::Memory,
            port: 3000,
            session_ttl_hours: 24,
            google_client_secret: "test_secret".to_string(),
            session_secret: b"test_session_secret_32_bytes_min!".to_vec(),
        }
    }

    /// Callback URL registered with Google.
    pub fn google_callback_url(&self) -> String {
        format!("{}/auth/google/callback", self.public_url)
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

/// Session lifetime in whole hours, between 1 and `MAX_SESSION_TTL_HOURS`.
fn parse_session_ttl_hours(raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|h| (1..=MAX_SESSION_TTL_HOURS).contains(h))
        .ok_or_else(|| {
            ConfigError::Invalid(
                "SESSION_TTL_HOURS",
                format!("expected 1..={} hours, got {}", MAX_SESSION_TTL_HOURS, raw),
            )
        })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
