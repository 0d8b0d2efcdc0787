// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Document Storage Module
//!
//! Persistent storage for users and products as plain JSON documents under
//! `DATA_DIR` (default `./data`).
//!
//! ## Storage Layout
//!
//! ```text
//! ./data/
//!   users/
//!     {user_id}.json
//!   products/
//!     {product_id}.json
//! ```
//!
//! ## Concurrency
//!
//! The store itself does no locking. `AppState` wraps it in an async
//! `RwLock`; handlers that mutate take the write half, which keeps
//! check-then-write sequences (unique email, cascade delete) atomic.

pub mod documents;
pub mod ownership;
pub mod paths;
pub mod repository;

pub use documents::{is_valid_document_id, DocumentStorage, StorageError, StorageResult};
pub use ownership::{OwnedResource, OwnershipEnforcer};
pub use paths::StoragePaths;
pub use repository::{ProductRepository, StoredProduct, StoredUser, UserRepository};
