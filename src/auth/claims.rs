// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the per-request caller identity.

use serde::{Deserialize, Serialize};

use super::roles::Role;

/// Claims carried by an issued token.
///
/// `role` is kept as the raw string on the wire so that tokens minted by other
/// issuers (which may decorate or re-case it) still decode; it is normalized
/// into [`Role`] when the [`Identity`] is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the caller's lowercased email
    pub sub: String,
    /// Role name, undecorated (`USER` / `ADMIN`)
    pub role: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// The resolved caller for one request.
///
/// Built from a decoded token or from a web session; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Lowercased email of the caller
    pub subject: String,
    /// Canonical role
    pub role: Role,
    /// Expiry of the credential this identity was derived from (Unix seconds)
    pub expires_at: i64,
}

impl Identity {
    pub fn new(subject: impl Into<String>, role: Role, expires_at: i64) -> Self {
        Self {
            subject: normalize_subject(&subject.into()),
            role,
            expires_at,
        }
    }

    /// Build an identity from decoded claims.
    ///
    /// Returns `None` when the subject is blank or the role is not one of the
    /// two known roles.
    pub fn from_claims(claims: &TokenClaims) -> Option<Self> {
        let subject = normalize_subject(&claims.sub);
        if subject.is_empty() {
            return None;
        }
        let role = Role::parse(&claims.role)?;
        Some(Self {
            subject,
            role,
            expires_at: claims.exp,
        })
    }

    /// Check if the caller has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Check if this caller is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Emails are the subject key; compare them trimmed and lowercased.
pub fn normalize_subject(email: &str) -> String {
    email.trim().to_lowercase()
}
