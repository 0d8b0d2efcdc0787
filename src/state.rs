// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::auth::{AccessPolicy, AuthenticationResolver, SessionStore, TokenCodec};
use crate::config::Config;
use crate::pipeline::RequestPipeline;
use crate::rate_limit::RateLimiter;
use crate::storage::{DocumentStorage, StoragePaths, StorageResult};

/// Shared state handed to every handler.
///
/// Cloning is cheap; everything behind it is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Document store. Take the write half for any mutation.
    pub storage: Arc<RwLock<DocumentStorage>>,
    pub tokens: Arc<TokenCodec>,
    pub sessions: Arc<SessionStore>,
    pub limiter: Arc<RateLimiter>,
    pub pipeline: RequestPipeline,
    pub token_ttl: Duration,
}

impl AppState {
    pub fn new(storage: DocumentStorage, config: &Config) -> Self {
        let tokens = Arc::new(TokenCodec::new(&config.jwt_secret));
        let sessions = Arc::new(SessionStore::new(config.session_ttl));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let pipeline = RequestPipeline::new(
            limiter.clone(),
            AuthenticationResolver::new(tokens.clone(), sessions.clone()),
            Arc::new(AccessPolicy::standard()),
        );

        Self {
            storage: Arc::new(RwLock::new(storage)),
            tokens,
            sessions,
            limiter,
            pipeline,
            token_ttl: config.token_ttl,
        }
    }

    /// Opens (creating if needed) the data directory named by `config`.
    pub fn from_config(config: &Config) -> StorageResult<Self> {
        let mut storage = DocumentStorage::new(StoragePaths::new(&config.data_dir));
        storage.initialize()?;
        Ok(Self::new(storage, config))
    }
}
