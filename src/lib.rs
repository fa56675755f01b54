// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tradedesk: account, session and access control for the trading dashboards
//!
//! This crate provides registration, password and Google sign-in, server-side
//! sessions, and the gate in front of every dashboard page.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{AccountService, IdentityProvider, SessionService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub accounts: AccountService,
    pub sessions: SessionService,
    pub identity: Arc<dyn IdentityProvider>,
}
