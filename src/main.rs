// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tradedesk Web Server
//!
//! Serves the login and registration flows and the session-gated
//! dashboard pages.

use std::sync::Arc;
use std::time::Duration;
use tradedesk::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, SessionStore, UserStore},
    services::{AccountService, GoogleOAuthClient, SessionService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are swept from the store.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.store_backend, "Starting Tradedesk");

    let (users, session_store): (Arc<dyn UserStore>, Arc<dyn SessionStore>) =
        match config.store_backend {
            StoreBackend::Firestore => {
                let db = Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);
                (db.clone(), db)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; users and sessions are lost on restart");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let identity = Arc::new(GoogleOAuthClient::new(&config)?);
    tracing::info!(callback = %config.google_callback_url(), "Google OAuth client initialized");

    let sessions = SessionService::new(session_store, &config);
    spawn_session_sweeper(sessions.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        accounts: AccountService::new(users),
        sessions,
        identity,
    });

    // Build router
    let app = tradedesk::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically delete expired sessions. Failures are logged and retried on
/// the next tick.
fn spawn_session_sweeper(sessions: SessionService) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Swept expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
            }
        }
    });
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tradedesk=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
