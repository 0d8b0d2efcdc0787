// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization rejections.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Rejection produced by the access policy or an ownership check.
///
/// Anonymous callers always get [`AuthError::AuthenticationRequired`]; callers
/// with an identity that lacks the privilege get [`AuthError::AccessDenied`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No (valid) identity on a protected route
    #[error("Full authentication is required to access this resource")]
    AuthenticationRequired,
    /// Identity present but not allowed
    #[error("Access Denied")]
    AccessDenied,
}

#[derive(Serialize)]
struct AuthErrorBody<'a> {
    status: u16,
    error: &'static str,
    message: String,
    path: &'a str,
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AuthError::AccessDenied => StatusCode::FORBIDDEN,
        }
    }

    /// Reason phrase placed in the `error` field.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::AuthenticationRequired => "Unauthorized",
            AuthError::AccessDenied => "Forbidden",
        }
    }

    /// Render the `{status, error, message, path}` envelope for `path`.
    pub fn into_response_for(self, path: &str) -> Response {
        let status = self.status_code();
        let body = AuthErrorBody {
            status: status.as_u16(),
            error: self.reason(),
            message: self.to_string(),
            path,
        };
        (status, Json(body)).into_response()
    }
}

/// Pairs a rejection with the request path so it can be returned from handlers.
#[derive(Debug)]
pub struct AuthRejection {
    pub error: AuthError,
    pub path: String,
}

impl AuthRejection {
    pub fn new(error: AuthError, path: impl Into<String>) -> Self {
        Self {
            error,
            path: path.into(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        self.error.into_response_for(&self.path)
    }
}
