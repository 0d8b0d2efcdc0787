// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Pipeline
//!
//! Every inbound request passes through the same sequence exactly once:
//!
//! ```text
//! RATE_CHECK ──▶ AUTHENTICATE ──▶ AUTHORIZE ──▶ DISPATCH
//!     │                               │
//!     ▼                               ▼
//! REJECTED(429)                 REJECTED(401 | 403)
//! ```
//!
//! Admission is a pure decision over `(method, path, headers, client key)`.
//! When it succeeds, the resolved caller is attached to the request as a
//! [`RequestContext`] extension and the handler runs; handlers read the caller
//! from there through the `Auth` extractors, never from ambient state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{AccessPolicy, AuthError, AuthenticationResolver, Chain, Identity, Requirement};
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

/// Key used when the remote address is unavailable.
const UNKNOWN_CLIENT: &str = "unknown";

/// Per-request authentication result, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub chain: Chain,
    pub requirement: Requirement,
    /// `None` for anonymous callers
    pub identity: Option<Identity>,
}

/// Why admission stopped before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    RateLimited,
    Auth(AuthError),
}

#[derive(Serialize)]
struct RateLimitedBody {
    error: &'static str,
    message: &'static str,
}

impl Rejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Rejection::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Rejection::Auth(e) => e.status_code(),
        }
    }

    pub fn into_response_for(self, path: &str) -> Response {
        match self {
            Rejection::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitedBody {
                    error: "Too many requests",
                    message: "Rate limit exceeded. Try again later.",
                }),
            )
                .into_response(),
            Rejection::Auth(e) => e.into_response_for(path),
        }
    }
}

/// Rate check, authentication and authorization in one place.
#[derive(Debug, Clone)]
pub struct RequestPipeline {
    limiter: Arc<RateLimiter>,
    resolver: AuthenticationResolver,
    policy: Arc<AccessPolicy>,
}

impl RequestPipeline {
    pub fn new(
        limiter: Arc<RateLimiter>,
        resolver: AuthenticationResolver,
        policy: Arc<AccessPolicy>,
    ) -> Self {
        Self {
            limiter,
            resolver,
            policy,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Run admission for one request.
    pub fn admit(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        client_key: &str,
    ) -> Result<RequestContext, Rejection> {
        if self.limiter.applies_to(path) && !self.limiter.try_consume(client_key, 1) {
            tracing::warn!(client = %client_key, %path, "Rate limit exceeded");
            return Err(Rejection::RateLimited);
        }

        let chain = self.policy.chain_for(path);
        let identity = self.resolver.resolve(chain, headers);

        let requirement = self
            .policy
            .authorize(method, path, identity.as_ref())
            .map_err(|e| {
                tracing::info!(
                    %method,
                    %path,
                    subject = identity.as_ref().map(|i| i.subject.as_str()),
                    reason = %e,
                    "Request rejected by access policy"
                );
                Rejection::Auth(e)
            })?;

        Ok(RequestContext {
            chain,
            requirement,
            identity,
        })
    }
}

/// Remote address of the connection, used as the rate-limit key.
pub fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware wrapping the whole router.
pub async fn guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let key = client_key(&request);

    match state
        .pipeline
        .admit(request.method(), &path, request.headers(), &key)
    {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(rejection) => rejection.into_response_for(&path),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{header::AUTHORIZATION, HeaderValue};

    use super::*;
    use crate::auth::{Role, SessionStore, TokenCodec};

    fn pipeline() -> (RequestPipeline, Arc<TokenCodec>) {
        let codec = Arc::new(TokenCodec::new(b"pipeline-test-secret-at-least-32-bytes"));
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(60)));
        let pipeline = RequestPipeline::new(
            Arc::new(RateLimiter::default()),
            AuthenticationResolver::new(codec.clone(), sessions),
            Arc::new(AccessPolicy::standard()),
        );
        (pipeline, codec)
    }

    fn bearer(codec: &TokenCodec, role: Role) -> HeaderMap {
        let token = codec
            .issue(&Identity::new("p@x.io", role, 0), Duration::from_secs(60))
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn public_route_admits_anonymous() {
        let (pipeline, _) = pipeline();
        let ctx = pipeline
            .admit(&Method::GET, "/api/products", &HeaderMap::new(), "1.1.1.1")
            .unwrap();
        assert!(ctx.identity.is_none());
        assert_eq!(ctx.chain, Chain::Api);
        assert_eq!(ctx.requirement, Requirement::Public);
    }

    #[test]
    fn protected_route_distinguishes_401_and_403() {
        let (pipeline, codec) = pipeline();

        let anon = pipeline.admit(&Method::GET, "/api/users", &HeaderMap::new(), "k");
        assert_eq!(anon.unwrap_err(), Rejection::Auth(AuthError::AuthenticationRequired));

        let user = pipeline.admit(&Method::GET, "/api/users", &bearer(&codec, Role::User), "k");
        assert_eq!(user.unwrap_err(), Rejection::Auth(AuthError::AccessDenied));

        let admin = pipeline
            .admit(&Method::GET, "/api/users", &bearer(&codec, Role::Admin), "k")
            .unwrap();
        assert_eq!(admin.identity.unwrap().role, Role::Admin);
    }

    #[test]
    fn rate_check_runs_before_authentication() {
        let (pipeline, codec) = pipeline();
        let headers = bearer(&codec, Role::Admin);
        for _ in 0..20 {
            assert!(pipeline.admit(&Method::GET, "/api/users", &headers, "9.9.9.9").is_ok());
        }
        assert_eq!(
            pipeline
                .admit(&Method::GET, "/api/users", &headers, "9.9.9.9")
                .unwrap_err(),
            Rejection::RateLimited
        );
        // Unlimited paths are unaffected by the exhausted bucket.
        assert!(pipeline
            .admit(&Method::GET, "/api/products", &headers, "9.9.9.9")
            .is_ok());
    }

    #[test]
    fn rejection_status_codes() {
        assert_eq!(Rejection::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            Rejection::Auth(AuthError::AuthenticationRequired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Rejection::Auth(AuthError::AccessDenied).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn rate_limited_body_is_fixed() {
        let response = Rejection::RateLimited.into_response_for("/api/auth/login");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"error":"Too many requests","message":"Rate limit exceeded. Try again later."}"#
        );
    }
}
