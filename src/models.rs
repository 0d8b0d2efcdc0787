// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Request types derive
//! `Validate`; the `ValidatedJson` extractor runs the rules and turns failures
//! into a 400 with per-field messages.
//!
//! ## Model Categories
//!
//! - **Auth**: login request and token response
//! - **Users**: registration, admin update, self-service profile update
//! - **Products**: create/update and the public product view

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::auth::Role;
use crate::storage::{StoredProduct, StoredUser};

/// Rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

// =============================================================================
// Auth Models
// =============================================================================

/// Credentials for `POST /api/auth/login`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a well-formed email address"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

// =============================================================================
// User Models
// =============================================================================

/// Registration body for `POST /api/users`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(message = "must be a well-formed email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "size must be at least 8"))]
    pub password: String,
    /// `USER` (default) or `ADMIN`
    #[serde(default)]
    pub role: Option<String>,
}

/// Admin update body for `PUT /api/users/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    /// New role; omitted or blank keeps the current one
    #[serde(default)]
    pub role: Option<String>,
}

/// Self-service body for `PUT /api/users/{id}/profile`.
///
/// Absent or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Public view of a user (never includes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&StoredUser> for UserResponse {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

// =============================================================================
// Product Models
// =============================================================================

/// Body for `POST /api/products` and `PUT /api/products/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ProductRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "must be greater than or equal to 0"))]
    pub price: f64,
}

/// Product as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    /// Owner email
    pub user_id: Option<String>,
    /// Owner display name, `Unknown` when the owner no longer exists
    pub owner_name: String,
}

/// Display name used when a product's owner cannot be resolved.
pub const UNKNOWN_OWNER: &str = "Unknown";

impl ProductResponse {
    pub fn new(product: &StoredProduct, owner_name: Option<&str>) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            user_id: product.owner.clone(),
            owner_name: owner_name.unwrap_or(UNKNOWN_OWNER).to_string(),
        }
    }
}
