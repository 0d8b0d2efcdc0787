// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed identity tokens (HS256 JWT).
//!
//! ## Format
//!
//! Claims are `{sub, role, iat, exp}` with `exp = iat + ttl`. The role is
//! written undecorated (`USER` / `ADMIN`).
//!
//! ## Security
//!
//! - Signature, structure, algorithm and expiry are all checked on decode
//! - Every failure collapses into [`TokenError::InvalidToken`]; callers cannot
//!   tell a bad signature from an expired token
//! - Expiry is strict: a token is valid only while `now < exp` (no leeway)

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{Identity, TokenClaims};

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Token errors.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Malformed, tampered, expired, or otherwise unusable token
    #[error("invalid token")]
    InvalidToken,
    /// Signing failed while issuing
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Encodes and decodes identity tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for the given HMAC secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the caller-supplied clock in `decode_at`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `identity` valid for `ttl` from now.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(identity, ttl, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (Unix seconds).
    pub fn issue_at(&self, identity: &Identity, ttl: Duration, now: i64) -> Result<String, TokenError> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            sub: identity.subject.clone(),
            role: identity.role.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Decode and verify a token against the current time.
    pub fn decode(&self, token: &str) -> Result<Identity, TokenError> {
        self.decode_at(token, Utc::now().timestamp())
    }

    /// Decode and verify a token as if the current time were `now`.
    pub fn decode_at(&self, token: &str, now: i64) -> Result<Identity, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::InvalidToken)?;
        let claims = data.claims;

        if now >= claims.exp {
            return Err(TokenError::InvalidToken);
        }

        Identity::from_claims(&claims).ok_or(TokenError::InvalidToken)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &[u8] = b"test-secret-that-is-at-least-32-bytes!!";
    const NOW: i64 = 1_700_000_000;
    const HOUR: Duration = Duration::from_secs(3600);

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET)
    }

    fn alice() -> Identity {
        Identity::new("alice@example.com", Role::User, 0)
    }

    #[test]
    fn decode_returns_issued_identity() {
        let codec = codec();
        let token = codec.issue_at(&alice(), HOUR, NOW).unwrap();

        let identity = codec.decode_at(&token, NOW + 10).unwrap();
        assert_eq!(identity.subject, "alice@example.com");
        assert_eq!(identity.role, Role::User);
        assert_eq!(identity.expires_at, NOW + 3600);
    }

    #[test]
    fn token_expires_exactly_at_ttl() {
        let codec = codec();
        let token = codec.issue_at(&alice(), HOUR, NOW).unwrap();

        assert!(codec.decode_at(&token, NOW + 3599).is_ok());
        assert!(matches!(
            codec.decode_at(&token, NOW + 3600),
            Err(TokenError::InvalidToken)
        ));
        assert!(codec.decode_at(&token, NOW + 7200).is_err());
    }

    #[test]
    fn issue_uses_wall_clock() {
        let codec = codec();
        let token = codec.issue(&alice(), HOUR).unwrap();
        assert!(codec.decode(&token).is_ok());
    }

    #[test]
    fn role_is_written_without_decoration() {
        let codec = codec();
        let admin = Identity::new("root@example.com", Role::Admin, 0);
        let token = codec.issue_at(&admin, HOUR, NOW).unwrap();

        let payload = token.split('.').nth(1).unwrap();
        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert_eq!(claims["role"], "ADMIN");
        assert_eq!(claims["sub"], "root@example.com");
        assert_eq!(claims["iat"], NOW);
        assert_eq!(claims["exp"], NOW + 3600);
    }

    #[test]
    fn flipping_any_character_invalidates_token() {
        let codec = codec();
        let token = codec.issue_at(&alice(), HOUR, NOW).unwrap();

        for (i, c) in token.char_indices() {
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + 1, &replacement.to_string());

            assert!(
                matches!(codec.decode_at(&tampered, NOW), Err(TokenError::InvalidToken)),
                "tampered token at position {i} was accepted"
            );
        }
    }

    #[test]
    fn forged_claims_with_original_signature_fail() {
        let codec = codec();
        let token = codec.issue_at(&alice(), HOUR, NOW).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_payload = URL_SAFE_NO_PAD.encode(format!(
            r#"{{"sub":"alice@example.com","role":"ADMIN","iat":{NOW},"exp":{}}}"#,
            NOW + 3600
        ));
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(codec.decode_at(&forged, NOW).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_fails() {
        let other = TokenCodec::new(b"another-secret-that-is-32-bytes-long!!");
        let token = other.issue_at(&alice(), HOUR, NOW).unwrap();
        assert!(codec().decode_at(&token, NOW).is_err());
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = codec();
        for input in ["", "abc", "a.b.c", "Bearer x.y.z"] {
            assert!(matches!(
                codec.decode_at(input, NOW),
                Err(TokenError::InvalidToken)
            ));
        }
    }

    #[test]
    fn decorated_role_from_other_issuer_is_normalized() {
        let claims = TokenClaims {
            sub: "Bob@Example.com".to_string(),
            role: "ROLE_admin".to_string(),
            iat: NOW,
            exp: NOW + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let identity = codec().decode_at(&token, NOW).unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(identity.subject, "bob@example.com");
    }

    #[test]
    fn unknown_role_claim_is_invalid() {
        let claims = TokenClaims {
            sub: "bob@example.com".to_string(),
            role: "OPERATOR".to_string(),
            iat: NOW,
            exp: NOW + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(codec().decode_at(&token, NOW).is_err());
    }
}
