// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-client token-bucket rate limiting.
//!
//! ## Algorithm
//!
//! Each client key (remote address) owns a bucket holding at most `capacity`
//! tokens. Refill is interval based: once per elapsed `window` the bucket is
//! topped up by `capacity` tokens, clamped to `capacity`. Partial windows add
//! nothing. A request costs one token; when the bucket cannot cover the cost
//! the request is refused and the bucket is left untouched.
//!
//! ## Scope
//!
//! Only brute-force sensitive routes are limited (login and user management).
//! Every other path bypasses the limiter.
//!
//! ## Memory
//!
//! Buckets idle for `idle_windows` windows are evicted by the maintenance task;
//! an evicted key simply starts over with a full bucket.

use std::time::{Duration, Instant};

use dashmap::{mapref::one::RefMut, DashMap};

use crate::auth::PathPattern;

/// Routes guarded by the limiter.
const LIMITED_PATTERNS: &[&str] = &["/api/auth/login", "/api/users/**"];

/// Limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Bucket size and amount added per window
    pub capacity: u32,
    /// Refill interval
    pub window: Duration,
    /// Windows of inactivity after which a bucket may be evicted
    pub idle_windows: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 20,
            window: Duration::from_secs(60),
            idle_windows: 10,
        }
    }
}

/// Rate-limit state for one client key.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub capacity: u32,
    pub tokens: u32,
    pub last_refill: Instant,
    pub last_seen: Instant,
}

impl Bucket {
    /// A full bucket.
    pub fn new(capacity: u32, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            last_refill: now,
            last_seen: now,
        }
    }

    fn refill(&mut self, now: Instant, window: Duration) {
        if window.is_zero() {
            self.tokens = self.capacity;
            self.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let periods = elapsed.as_nanos() / window.as_nanos();
        if periods == 0 {
            return;
        }

        let added = periods.saturating_mul(u128::from(self.capacity));
        let tokens = (u128::from(self.tokens) + added).min(u128::from(self.capacity));
        self.tokens = u32::try_from(tokens).unwrap_or(self.capacity);

        // Advance by whole windows so the next refill stays on the same grid.
        let periods = u32::try_from(periods).unwrap_or(u32::MAX);
        self.last_refill = window
            .checked_mul(periods)
            .and_then(|advance| self.last_refill.checked_add(advance))
            .unwrap_or(now);
    }

    /// Refill for `now`, then take `cost` tokens if available.
    pub fn try_consume_at(&mut self, now: Instant, window: Duration, cost: u32) -> bool {
        self.refill(now, window);
        self.last_seen = now;
        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }
}

/// Concurrent key → bucket map.
///
/// Bucket creation is atomic per key (`entry().or_insert_with`), and the shard
/// guard held for the duration of a consume serializes concurrent requests
/// sharing a key.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    config: RateLimitConfig,
    limited: Vec<PathPattern>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
            limited: LIMITED_PATTERNS.iter().map(|p| PathPattern::parse(p)).collect(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether requests to `path` go through the limiter.
    pub fn applies_to(&self, path: &str) -> bool {
        self.config.enabled && self.limited.iter().any(|p| p.matches(path))
    }

    /// Existing bucket for `key`, or a freshly created full one.
    pub fn resolve_bucket(&self, key: &str, now: Instant) -> RefMut<'_, String, Bucket> {
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::new(self.config.capacity, now))
    }

    /// Take `cost` tokens from `key`'s bucket.
    pub fn try_consume(&self, key: &str, cost: u32) -> bool {
        self.try_consume_at(key, cost, Instant::now())
    }

    pub fn try_consume_at(&self, key: &str, cost: u32, now: Instant) -> bool {
        let mut bucket = self.resolve_bucket(key, now);
        bucket.try_consume_at(now, self.config.window, cost)
    }

    /// Drop buckets unused for `idle_windows` windows. Returns how many were
    /// removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let max_idle = self
            .config
            .window
            .checked_mul(self.config.idle_windows.max(1))
            .unwrap_or(Duration::MAX);
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) < max_idle);
        before.saturating_sub(self.buckets.len())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
