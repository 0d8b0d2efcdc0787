// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route-level access rules and resource ownership checks.
//!
//! ## Rule sets
//!
//! The policy is an ordered list of [`RuleSet`]s. Each set is guarded by a
//! path prefix; the first set whose prefix selects the request path is the
//! only one evaluated. Inside a set, rules are tried top to bottom and the
//! first rule matching `(method, path)` decides.
//!
//! | Chain | Prefix | Credential |
//! |-------|--------|------------|
//! | API   | `/api` | `Authorization: Bearer <token>` |
//! | Web   | (rest) | `SESSION` cookie |
//!
//! ## Patterns
//!
//! `*` matches exactly one path segment, `**` matches zero or more. Patterns
//! in a prefixed set are written relative to the prefix (`/products/**`).

use axum::http::Method;

use super::{AuthError, Identity, Role};

/// Which credential source a path is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    /// Stateless bearer tokens
    Api,
    /// Cookie-backed sessions
    Web,
}

/// What a rule demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    Role(Role),
    /// Authenticated at route level; the handler then calls
    /// [`check_ownership`] with admin override.
    OwnerOrAdmin,
    /// Nobody; used when no rule matches.
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    One,
    Many,
}

/// Ant-style path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|s| match s {
                "**" => Segment::Many,
                "*" => Segment::One,
                other => Segment::Literal(other.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split_path(path).collect();
        match_segments(&self.segments, &parts)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Many, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((Segment::One, rest)) => !path.is_empty() && match_segments(rest, &path[1..]),
        Some((Segment::Literal(lit), rest)) => {
            path.first().is_some_and(|p| p == lit) && match_segments(rest, &path[1..])
        }
    }
}

/// One row of a rule table.
#[derive(Debug, Clone)]
pub struct AccessRule {
    /// `None` matches any method
    pub method: Option<Method>,
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl AccessRule {
    pub fn new(method: Option<Method>, pattern: &str, requirement: Requirement) -> Self {
        Self {
            method,
            pattern: PathPattern::parse(pattern),
            requirement,
        }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.pattern.matches(path)
    }
}

/// An ordered rule table guarded by a path prefix.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub chain: Chain,
    /// `None` selects every path
    prefix: Option<String>,
    rules: Vec<AccessRule>,
}

impl RuleSet {
    pub fn new(chain: Chain, prefix: Option<&str>, rules: Vec<AccessRule>) -> Self {
        Self {
            chain,
            prefix: prefix.map(|p| p.trim_end_matches('/').to_string()),
            rules,
        }
    }

    /// Returns the path relative to this set's prefix when the set applies.
    fn select<'a>(&self, path: &'a str) -> Option<&'a str> {
        let Some(prefix) = &self.prefix else {
            return Some(path);
        };
        let rest = path.strip_prefix(prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    fn requirement_for(&self, method: &Method, relative: &str) -> Option<Requirement> {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, relative))
            .map(|rule| rule.requirement)
    }
}

/// The complete routing policy.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rule_sets: Vec<RuleSet>,
}

impl AccessPolicy {
    pub fn new(rule_sets: Vec<RuleSet>) -> Self {
        Self { rule_sets }
    }

    /// API chain first, web chain as the catch-all.
    pub fn standard() -> Self {
        use Requirement as R;
        let rule = AccessRule::new;

        let api = RuleSet::new(
            Chain::Api,
            Some("/api"),
            vec![
                rule(Some(Method::OPTIONS), "/**", R::Public),
                rule(Some(Method::GET), "/products/**", R::Public),
                rule(Some(Method::POST), "/auth/login", R::Public),
                rule(Some(Method::POST), "/users", R::Public),
                rule(Some(Method::GET), "/users", R::Role(Role::Admin)),
                rule(Some(Method::GET), "/users/*", R::Role(Role::Admin)),
                rule(Some(Method::PUT), "/users/*", R::Role(Role::Admin)),
                rule(Some(Method::DELETE), "/users/*", R::OwnerOrAdmin),
                rule(Some(Method::PUT), "/users/*/profile", R::OwnerOrAdmin),
                rule(None, "/products/**", R::Authenticated),
                rule(None, "/**", R::Authenticated),
            ],
        );

        let mut web_rules: Vec<AccessRule> = [
            "/",
            "/login",
            "/register",
            "/products",
            "/auth/register",
            "/logout",
            "/css/**",
            "/js/**",
            "/static/**",
            "/health/**",
            "/docs/**",
            "/api-doc/**",
        ]
        .into_iter()
        .map(|p| rule(None, p, R::Public))
        .collect();
        web_rules.push(rule(None, "/web/admin/**", R::Role(Role::Admin)));
        web_rules.push(rule(None, "/**", R::Authenticated));

        let web = RuleSet::new(Chain::Web, None, web_rules);

        Self::new(vec![api, web])
    }

    /// Which chain serves `path`. Paths no set selects fall to the web chain.
    pub fn chain_for(&self, path: &str) -> Chain {
        self.rule_sets
            .iter()
            .find(|set| set.select(path).is_some())
            .map_or(Chain::Web, |set| set.chain)
    }

    /// Resolve the requirement for a request, failing closed when no rule
    /// matches.
    pub fn requirement(&self, method: &Method, path: &str) -> Requirement {
        self.rule_sets
            .iter()
            .find_map(|set| set.select(path).map(|rel| set.requirement_for(method, rel)))
            .flatten()
            .unwrap_or(Requirement::Deny)
    }

    /// Route-level decision for `(method, path)` and the resolved caller.
    pub fn authorize(
        &self,
        method: &Method,
        path: &str,
        identity: Option<&Identity>,
    ) -> Result<Requirement, AuthError> {
        let requirement = self.requirement(method, path);
        match (requirement, identity) {
            (Requirement::Public, _) => Ok(requirement),
            (_, None) => Err(AuthError::AuthenticationRequired),
            (Requirement::Deny, Some(_)) => Err(AuthError::AccessDenied),
            (Requirement::Role(required), Some(id)) if !id.has_role(required) => {
                Err(AuthError::AccessDenied)
            }
            _ => Ok(requirement),
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Decide whether `identity` may act on a resource owned by `owner`.
///
/// Owners are compared by normalized subject (email). A missing owner denies
/// everyone except an admin when `allow_admin_override` is set.
pub fn check_ownership(
    owner: Option<&str>,
    identity: &Identity,
    allow_admin_override: bool,
) -> Result<(), AuthError> {
    if allow_admin_override && identity.is_admin() {
        return Ok(());
    }
    match owner {
        Some(owner) if !owner.trim().is_empty() && super::normalize_subject(owner) == identity.subject => {
            Ok(())
        }
        _ => Err(AuthError::AccessDenied),
    }
}
