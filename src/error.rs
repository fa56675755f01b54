// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent responses.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Application error type that converts to HTTP responses.
///
/// Route handlers usually map these into redirects or inline messages
/// themselves; `IntoResponse` is the fallback for anything that escapes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Incorrect password")]
    BadCredential,

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Identity provider error: {0}")]
    ProviderError(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short machine-readable code for logs and error pages.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadCredential => "bad_credential",
            AppError::Conflict(_) => "conflict",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidState(_) => "invalid_state",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::ProviderError(_) => "provider_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status used when the error reaches the response boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadCredential => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Store error");
            }
            AppError::ProviderError(msg) => {
                tracing::error!(error = %msg, "Identity provider error");
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
            }
            _ => {}
        }

        let body = format!(
            "<!doctype html><html><head><title>{status}</title></head>\
             <body><h1>{status}</h1><p>{code}</p><p><a href=\"/login\">Back to login</a></p></body></html>",
            status = status,
            code = self.code(),
        );

        (status, Html(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
