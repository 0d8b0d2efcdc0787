// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the caller resolved by the request pipeline.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller is Identity
//! }
//! ```
//!
//! The extractors only read the [`RequestContext`] that the pipeline guard
//! attached; they never touch credentials themselves.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthRejection, Identity};
use crate::pipeline::RequestContext;

fn identity_from(parts: &Parts) -> Option<Identity> {
    parts
        .extensions
        .get::<RequestContext>()
        .and_then(|ctx| ctx.identity.clone())
}

/// Extractor for authenticated callers.
pub struct Auth(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from(parts).map(Auth).ok_or_else(|| {
            AuthRejection::new(AuthError::AuthenticationRequired, parts.uri.path())
        })
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;

        if !identity.is_admin() {
            return Err(AuthRejection::new(AuthError::AccessDenied, parts.uri.path()));
        }

        Ok(AdminOnly(identity))
    }
}

/// Optional authentication extractor.
///
/// Yields `None` for anonymous callers on public routes.
pub struct OptionalAuth(pub Option<Identity>);

impl<S: Send + Sync> FromRequestParts<S> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(identity_from(parts)))
    }
}
