// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Authority prefix some issuers put in front of role names.
const AUTHORITY_PREFIX: &str = "ROLE_";

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - May manage every user and every product
/// - `User` - May manage their own account and the products they own
///
/// Role strings are normalized exactly once, when they enter the process
/// (token decode, document load, request body). Everything past that boundary
/// compares enum values only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Ordinary account
    User,
    /// Full administrative access
    Admin,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::User, Role::User) => true,
            _ => false,
        }
    }

    /// Parse a role claim into its canonical form.
    ///
    /// Case-insensitive, surrounding whitespace ignored, and any number of
    /// leading `ROLE_` decorations stripped (`"role_admin"` is `Admin`).
    pub fn parse(s: &str) -> Option<Role> {
        let mut normalized = s.trim().to_ascii_uppercase();
        while let Some(stripped) = normalized.strip_prefix(AUTHORITY_PREFIX) {
            normalized = stripped.to_string();
        }
        match normalized.as_str() {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Canonical, undecorated name (as stored in tokens and documents).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl Default for Role {
    /// Accounts created without an explicit role are ordinary users.
    fn default() -> Self {
        Role::User
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Role::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown role `{raw}`")))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Admin.has_privilege(Role::User));
    }

    #[test]
    fn user_only_has_user_privilege() {
        assert!(!Role::User.has_privilege(Role::Admin));
        assert!(Role::User.has_privilege(Role::User));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse(" User "), Some(Role::User));
        assert_eq!(Role::parse("unknown"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn parse_strips_authority_prefix() {
        assert_eq!(Role::parse("ROLE_ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("role_user"), Some(Role::User));
        assert_eq!(Role::parse("ROLE_ROLE_ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("ROLE_"), None);
    }

    #[test]
    fn serde_uses_canonical_form() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""ADMIN""#);
        let parsed: Role = serde_json::from_str(r#""role_admin""#).unwrap();
        assert_eq!(parsed, Role::Admin);
        assert!(serde_json::from_str::<Role>(r#""superuser""#).is_err());
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
