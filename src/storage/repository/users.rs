// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Each user is stored as a separate JSON file under `users/`. Email is the
//! unique, case-normalized login key and the subject carried in tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{is_valid_document_id, DocumentStorage, OwnedResource, StorageError, StorageResult};
use super::products::ProductRepository;
use crate::auth::{normalize_subject, Role};

/// User document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Unique user identifier (UUID)
    pub id: String,
    pub name: String,
    /// Lowercased email
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl OwnedResource for StoredUser {
    /// A user account is owned by the user it describes.
    fn owner_subject(&self) -> Option<&str> {
        Some(&self.email)
    }
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    storage: &'a DocumentStorage,
}

impl<'a> UserRepository<'a> {
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self { storage }
    }

    /// Check if a user exists.
    pub fn exists(&self, user_id: &str) -> bool {
        is_valid_document_id(user_id) && self.storage.exists(self.storage.paths().user(user_id))
    }

    /// Get a user by ID.
    pub fn get(&self, user_id: &str) -> StorageResult<StoredUser> {
        if !self.exists(user_id) {
            return Err(StorageError::NotFound(format!("User {user_id}")));
        }
        self.storage.read_json(self.storage.paths().user(user_id))
    }

    /// Find a user by email, ignoring case and surrounding whitespace.
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let wanted = normalize_subject(email);
        Ok(self.list_all()?.into_iter().find(|u| u.email == wanted))
    }

    /// List all users.
    pub fn list_all(&self) -> StorageResult<Vec<StoredUser>> {
        let ids = self.storage.list_ids(self.storage.paths().users_dir())?;

        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id) {
                Ok(user) => users.push(user),
                Err(e) => tracing::warn!(user_id = %id, error = %e, "Skipping unreadable user document"),
            }
        }
        Ok(users)
    }

    /// Create a new user. The email is normalized before storing.
    ///
    /// # Errors
    /// `AlreadyExists` when the id or the email is taken.
    pub fn create(&self, user: &StoredUser) -> StorageResult<StoredUser> {
        if !is_valid_document_id(&user.id) {
            return Err(StorageError::NotFound(format!("User {}", user.id)));
        }
        if self.exists(&user.id) {
            return Err(StorageError::AlreadyExists(format!("User {}", user.id)));
        }
        if self.find_by_email(&user.email)?.is_some() {
            return Err(StorageError::AlreadyExists("Email already in use".to_string()));
        }

        let mut user = user.clone();
        user.email = normalize_subject(&user.email);
        self.storage.write_json(self.storage.paths().user(&user.id), &user)?;
        Ok(user)
    }

    /// Update an existing user.
    pub fn update(&self, user: &StoredUser) -> StorageResult<()> {
        if !self.exists(&user.id) {
            return Err(StorageError::NotFound(format!("User {}", user.id)));
        }
        self.storage.write_json(self.storage.paths().user(&user.id), user)
    }

    /// Delete a user document only.
    pub fn delete(&self, user_id: &str) -> StorageResult<()> {
        if !self.exists(user_id) {
            return Err(StorageError::NotFound(format!("User {user_id}")));
        }
        self.storage.delete(self.storage.paths().user(user_id))
    }

    /// Delete a user and every product they own.
    ///
    /// Products go first so a failure never leaves products pointing at a
    /// user that was already removed. Returns the deleted user and how many
    /// products were removed with it.
    pub fn delete_cascade(&self, user_id: &str) -> StorageResult<(StoredUser, usize)> {
        let user = self.get(user_id)?;

        let products = ProductRepository::new(self.storage);
        let owned = products.list_by_owner(&user.email)?;
        for product in &owned {
            products.delete(&product.id)?;
        }

        self.delete(user_id)?;
        Ok((user, owned.len()))
    }
}
