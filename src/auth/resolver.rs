// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Turns request credentials into a caller [`Identity`].
//!
//! The API chain reads `Authorization: Bearer <token>`; the web chain reads the
//! `SESSION` cookie. A missing, malformed, or expired credential resolves to
//! `None` (anonymous). Rejecting anonymous callers is the access policy's job.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::CookieJar;

use super::{Chain, Identity, SessionStore, TokenCodec, SESSION_COOKIE};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone)]
pub struct AuthenticationResolver {
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionStore>,
}

impl AuthenticationResolver {
    pub fn new(codec: Arc<TokenCodec>, sessions: Arc<SessionStore>) -> Self {
        Self { codec, sessions }
    }

    /// Resolve the caller for a request served by `chain`.
    ///
    /// Only the credential source belonging to the chain is consulted, so a
    /// request never ends up with two identities.
    pub fn resolve(&self, chain: Chain, headers: &HeaderMap) -> Option<Identity> {
        match chain {
            Chain::Api => self.from_bearer(headers),
            Chain::Web => self.from_session(headers),
        }
    }

    fn from_bearer(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = bearer_token(headers)?;
        match self.codec.decode(token) {
            Ok(identity) => Some(identity),
            Err(_) => {
                tracing::debug!("Bearer token rejected; continuing as anonymous");
                None
            }
        }
    }

    fn from_session(&self, headers: &HeaderMap) -> Option<Identity> {
        let jar = CookieJar::from_headers(headers);
        let session_id = jar.get(SESSION_COOKIE)?.value().to_string();
        self.sessions.get(&session_id)
    }
}

/// Extract the raw token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}
