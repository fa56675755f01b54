// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth handshake plumbing shared by identity providers.
//!
//! The `state` parameter is `base64url(nonce|timestamp_hex|hmac_hex)`. The
//! nonce is also kept in a short-lived cookie scoped to the callback path,
//! binding the callback to the browser that started the flow.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AppError;
use crate::services::token;

pub const OAUTH_NONCE_COOKIE: &str = "tradedesk_oauth_nonce";

/// How long a started handshake stays valid.
pub const STATE_MAX_AGE_MILLIS: u128 = 10 * 60 * 1000;

/// Identity proven by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    /// Provider's stable subject identifier
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// An external OAuth 2.0 / OpenID Connect provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL to send the browser to. `nonce` must come back in the ID token.
    fn authorization_url(&self, state: &str, nonce: &str) -> String;

    /// Trade an authorization code for a verified profile.
    async fn exchange_code(&self, code: &str, nonce: &str) -> Result<OAuthProfile, AppError>;
}

pub fn now_millis() -> Result<u128, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Build a signed `state` value for `nonce`.
pub fn sign_state(secret: &[u8], nonce: &str, issued_at_millis: u128) -> Result<String, AppError> {
    let payload = format!("{}|{:x}", nonce, issued_at_millis);
    let signature = token::sign(secret, &payload)?;
    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature).as_bytes()))
}

/// Verify signature and age of a `state` value and return its nonce.
pub fn verify_state(secret: &[u8], state: &str, now_millis: u128) -> Result<String, AppError> {
    let invalid = |reason: &str| AppError::InvalidState(reason.to_string());

    let bytes = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|_| invalid("not base64"))?;
    let state_str = String::from_utf8(bytes).map_err(|_| invalid("not utf-8"))?;

    // Format is "nonce|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return Err(invalid("malformed"));
    };

    let payload = format!("{}|{}", nonce, timestamp_hex);
    if !token::verify(secret, &payload, signature_hex) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return Err(invalid("bad signature"));
    }

    let issued_at = u128::from_str_radix(timestamp_hex, 16).map_err(|_| invalid("bad timestamp"))?;
    if issued_at > now_millis || now_millis - issued_at > STATE_MAX_AGE_MILLIS {
        return Err(invalid("expired"));
    }

    Ok(nonce.to_string())
}
