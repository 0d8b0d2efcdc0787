// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for stored resources.
//!
//! Every mutation of a user-owned document goes through
//! [`OwnershipEnforcer::verify_ownership`], which delegates to the single
//! [`check_ownership`] rule.

use crate::auth::{check_ownership, AuthError, Identity};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Subject (email) of the owner, if the resource still records one.
    fn owner_subject(&self) -> Option<&str>;
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that `identity` may mutate this resource.
    ///
    /// # Errors
    /// Returns `AuthError::AccessDenied` for anyone but the owner, unless
    /// `allow_admin_override` is set and the caller is an admin.
    fn verify_ownership(&self, identity: &Identity, allow_admin_override: bool) -> Result<(), AuthError>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, identity: &Identity, allow_admin_override: bool) -> Result<(), AuthError> {
        check_ownership(self.owner_subject(), identity, allow_admin_override)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    struct TestResource {
        owner: Option<String>,
    }

    impl OwnedResource for TestResource {
        fn owner_subject(&self) -> Option<&str> {
            self.owner.as_deref()
        }
    }

    fn owned_by(owner: &str) -> TestResource {
        TestResource {
            owner: Some(owner.to_string()),
        }
    }

    #[test]
    fn owner_can_access() {
        let caller = Identity::new("owner@x.io", Role::User, 0);
        assert!(owned_by("owner@x.io").verify_ownership(&caller, false).is_ok());
    }

    #[test]
    fn non_owner_denied() {
        let caller = Identity::new("other@x.io", Role::User, 0);
        assert_eq!(
            owned_by("owner@x.io").verify_ownership(&caller, true),
            Err(AuthError::AccessDenied)
        );
    }

    #[test]
    fn orphaned_resource_only_admin_override() {
        let orphan = TestResource { owner: None };
        let user = Identity::new("u@x.io", Role::User, 0);
        let admin = Identity::new("a@x.io", Role::Admin, 0);

        assert!(orphan.verify_ownership(&user, true).is_err());
        assert!(orphan.verify_ownership(&admin, true).is_ok());
        assert!(orphan.verify_ownership(&admin, false).is_err());
    }
}
