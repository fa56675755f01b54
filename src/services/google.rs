// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in: authorization redirect and code exchange.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::services::google_oidc::{GoogleIdTokenVerifier, DEFAULT_HTTP_TIMEOUT};
use crate::services::oauth::{IdentityProvider, OAuthProfile};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str = "openid profile email";

/// Google OAuth 2.0 client.
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    verifier: GoogleIdTokenVerifier,
}

/// Token endpoint response. Only the ID token is used.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

/// Error body from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = GoogleIdTokenVerifier::new(&config.google_client_id)?;
        Self::with_verifier(config, verifier)
    }

    /// Build a client around an existing verifier (e.g. a static-key one).
    pub fn with_verifier(config: &Config, verifier: GoogleIdTokenVerifier) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building Google OAuth HTTP client")?;

        Ok(Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_callback_url(),
            verifier,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuthClient {
    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&nonce={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
            urlencoding::encode(nonce),
        )
    }

    async fn exchange_code(&self, code: &str, nonce: &str) -> Result<OAuthProfile, AppError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                })
                .unwrap_or(body);
            return Err(AppError::ProviderError(format!("HTTP {}: {}", status, detail)));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("JSON parse error: {}", e)))?;

        let id_token = tokens.id_token.ok_or_else(|| {
            AppError::ProviderError("token response has no id_token".to_string())
        })?;

        let identity = self.verifier.verify_id_token(&id_token, nonce).await?;

        Ok(OAuthProfile {
            subject: identity.subject,
            email: identity.email,
            display_name: identity.name,
            first_name: identity.given_name,
            last_name: identity.family_name,
        })
    }
}
