// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Maintenance Sweeper
//!
//! Background task that keeps the in-process stores bounded. Every
//! `interval` it evicts rate-limit buckets that have been idle for the
//! configured number of windows and drops expired web sessions.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; the server cancels it when the
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::SessionStore;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Sweeper {
    limiter: Arc<RateLimiter>,
    sessions: Arc<SessionStore>,
    interval: Duration,
}

impl Sweeper {
    /// Sweeps once per rate-limit window, but never more than once a second.
    pub fn new(state: &AppState) -> Self {
        Self {
            limiter: state.limiter.clone(),
            sessions: state.sessions.clone(),
            interval: state.limiter.config().window.max(MIN_INTERVAL),
        }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(Sweeper::new(&state).run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Maintenance sweeper starting");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Maintenance sweeper shutting down");
                    return;
                }
            }

            self.sweep_at(Instant::now());
        }
    }

    /// One pass. Returns `(buckets evicted, sessions expired)`.
    pub fn sweep_at(&self, now: Instant) -> (usize, usize) {
        let buckets = self.limiter.evict_idle(now);
        let sessions = self.sessions.sweep_expired_at(now);
        if buckets > 0 || sessions > 0 {
            debug!(buckets, sessions, "Maintenance sweep");
        }
        (buckets, sessions)
    }
}
