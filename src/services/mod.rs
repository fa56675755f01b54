// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod google;
pub mod google_oidc;
pub mod oauth;
pub mod password;
pub mod session;
pub mod token;

pub use accounts::{AccountService, Registration};
pub use google::GoogleOAuthClient;
pub use google_oidc::{GoogleIdTokenVerifier, OidcError, VerifiedGoogleIdentity};
pub use oauth::{IdentityProvider, OAuthProfile};
pub use session::SessionService;
