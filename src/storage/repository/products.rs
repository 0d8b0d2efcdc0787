// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Product repository.
//!
//! Products are stored under `products/`, one JSON file each. The owner is
//! recorded by email; it is checked at creation time only, so a product may
//! outlive its owner if it was not removed by a cascade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{is_valid_document_id, DocumentStorage, OwnedResource, StorageError, StorageResult};
use crate::auth::normalize_subject;

/// Product document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredProduct {
    /// Unique product identifier (UUID)
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    /// Owner email; `None` for orphaned products
    #[serde(default)]
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OwnedResource for StoredProduct {
    fn owner_subject(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

/// Repository for product operations.
pub struct ProductRepository<'a> {
    storage: &'a DocumentStorage,
}

impl<'a> ProductRepository<'a> {
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, product_id: &str) -> bool {
        is_valid_document_id(product_id)
            && self.storage.exists(self.storage.paths().product(product_id))
    }

    /// Get a product by ID.
    pub fn get(&self, product_id: &str) -> StorageResult<StoredProduct> {
        if !self.exists(product_id) {
            return Err(StorageError::NotFound(format!("Product {product_id}")));
        }
        self.storage.read_json(self.storage.paths().product(product_id))
    }

    /// List all products, oldest first.
    pub fn list_all(&self) -> StorageResult<Vec<StoredProduct>> {
        let ids = self.storage.list_ids(self.storage.paths().products_dir())?;

        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id) {
                Ok(product) => products.push(product),
                Err(e) => {
                    tracing::warn!(product_id = %id, error = %e, "Skipping unreadable product document")
                }
            }
        }
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }

    /// List the products owned by `owner` (email, case-insensitive).
    pub fn list_by_owner(&self, owner: &str) -> StorageResult<Vec<StoredProduct>> {
        let owner = normalize_subject(owner);
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|p| p.owner.as_deref().map(normalize_subject).as_deref() == Some(owner.as_str()))
            .collect())
    }

    /// Create a new product.
    pub fn create(&self, product: &StoredProduct) -> StorageResult<()> {
        if !is_valid_document_id(&product.id) {
            return Err(StorageError::NotFound(format!("Product {}", product.id)));
        }
        if self.exists(&product.id) {
            return Err(StorageError::AlreadyExists(format!("Product {}", product.id)));
        }
        self.storage
            .write_json(self.storage.paths().product(&product.id), product)
    }

    /// Update an existing product.
    pub fn update(&self, product: &StoredProduct) -> StorageResult<()> {
        if !self.exists(&product.id) {
            return Err(StorageError::NotFound(format!("Product {}", product.id)));
        }
        self.storage
            .write_json(self.storage.paths().product(&product.id), product)
    }

    /// Delete a product.
    pub fn delete(&self, product_id: &str) -> StorageResult<()> {
        if !self.exists(product_id) {
            return Err(StorageError::NotFound(format!("Product {product_id}")));
        }
        self.storage.delete(self.storage.paths().product(product_id))
    }
}
