// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token issuance, credential resolution and the access policy.
//!
//! ## Auth Flow
//!
//! 1. API clients log in with email + password and receive a signed token
//! 2. They send `Authorization: Bearer <token>` on later requests
//! 3. Browsers log in through the form and carry a `SESSION` cookie instead
//! 4. The pipeline resolves either credential into an [`Identity`] and asks
//!    the [`AccessPolicy`] whether the route admits it
//! 5. Mutating handlers additionally call [`check_ownership`]
//!
//! ## Security
//!
//! - Tokens are HS256 with a server-held secret; any decode failure is opaque
//! - An invalid credential makes the caller anonymous, it never errors by itself
//! - Roles are a closed enum, normalized once at the boundary

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod policy;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod token;

pub use claims::{normalize_subject, Identity, TokenClaims};
pub use error::{AuthError, AuthRejection};
pub use extractor::{AdminOnly, Auth, OptionalAuth};
pub use password::{
    dummy_hash, hash_password, hash_password_blocking, verify_password, verify_password_blocking,
    PasswordError,
};
pub use policy::{check_ownership, AccessPolicy, AccessRule, Chain, PathPattern, Requirement, RuleSet};
pub use resolver::{bearer_token, AuthenticationResolver};
pub use roles::Role;
pub use session::{SessionStore, SESSION_COOKIE};
pub use token::{TokenCodec, TokenError, MIN_SECRET_LEN};
