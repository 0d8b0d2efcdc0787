// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Let's Play - Users & Products API
//!
//! A users/products CRUD backend whose interesting part is request admission:
//! per-client rate limiting, bearer-token and session authentication, and a
//! path-partitioned access policy with ownership checks inside handlers.
//!
//! ## Modules
//!
//! - `api` - JSON API handlers (Axum) and the application router
//! - `auth` - Tokens, sessions, roles and the access policy
//! - `pipeline` - Rate check, authentication and authorization middleware
//! - `rate_limit` - Per-client token buckets
//! - `storage` - JSON document store for users and products
//! - `web` - Session-backed browser routes

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod models;
pub mod pipeline;
pub mod rate_limit;
pub mod state;
pub mod storage;
pub mod web;
