// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for JSON documents | `./data` |
//! | `JWT_SECRET` | Token signing secret (at least 32 bytes) | Random per process |
//! | `JWT_TTL_SECONDS` | Token lifetime | `86400` |
//! | `SESSION_TTL_SECONDS` | Web session idle timeout | `1800` |
//! | `RATE_LIMIT_ENABLED` | Enable the login/user-management limiter | `true` |
//! | `RATE_LIMIT_CAPACITY` | Bucket size and tokens added per window | `20` |
//! | `RATE_LIMIT_WINDOW_SECONDS` | Refill interval | `60` |
//! | `RATE_LIMIT_IDLE_WINDOWS` | Idle windows before a bucket is evicted | `10` |
//! | `SEED_ADMIN_EMAIL` | Bootstrap admin account email | Unset |
//! | `SEED_ADMIN_PASSWORD` | Bootstrap admin account password | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

use argon2::password_hash::rand_core::{OsRng, RngCore};

use crate::auth::MIN_SECRET_LEN;
use crate::rate_limit::RateLimitConfig;
use crate::storage::paths::DATA_ROOT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_ENV: &str = "JWT_TTL_SECONDS";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECONDS";
pub const RATE_LIMIT_ENABLED_ENV: &str = "RATE_LIMIT_ENABLED";
pub const RATE_LIMIT_CAPACITY_ENV: &str = "RATE_LIMIT_CAPACITY";
pub const RATE_LIMIT_WINDOW_ENV: &str = "RATE_LIMIT_WINDOW_SECONDS";
pub const RATE_LIMIT_IDLE_WINDOWS_ENV: &str = "RATE_LIMIT_IDLE_WINDOWS";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default web session idle timeout (30 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
    #[error("JWT_SECRET must be at least 32 bytes")]
    SecretTooShort,
    #[error("SEED_ADMIN_EMAIL and SEED_ADMIN_PASSWORD must be set together")]
    IncompleteSeedAdmin,
}

/// Bootstrap admin credentials.
#[derive(Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    pub jwt_secret: Vec<u8>,
    /// True when no secret was configured and one was generated
    pub jwt_secret_generated: bool,
    pub token_ttl: Duration,
    pub session_ttl: Duration,
    pub rate_limit: RateLimitConfig,
    pub seed_admin: Option<SeedAdmin>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("jwt_secret_generated", &self.jwt_secret_generated)
            .field("token_ttl", &self.token_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("rate_limit", &self.rate_limit)
            .field("seed_admin", &self.seed_admin)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to read variables. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let (jwt_secret, jwt_secret_generated) = match get(JWT_SECRET_ENV) {
            Some(secret) if secret.len() < MIN_SECRET_LEN => return Err(ConfigError::SecretTooShort),
            Some(secret) => (secret.into_bytes(), false),
            None => (random_secret(), true),
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            enabled: parse_bool(RATE_LIMIT_ENABLED_ENV, get(RATE_LIMIT_ENABLED_ENV), defaults.enabled)?,
            capacity: parse_num(RATE_LIMIT_CAPACITY_ENV, get(RATE_LIMIT_CAPACITY_ENV), defaults.capacity)?,
            window: parse_positive_secs(RATE_LIMIT_WINDOW_ENV, get(RATE_LIMIT_WINDOW_ENV), defaults.window)?,
            idle_windows: parse_num(
                RATE_LIMIT_IDLE_WINDOWS_ENV,
                get(RATE_LIMIT_IDLE_WINDOWS_ENV),
                defaults.idle_windows,
            )?,
        };

        let seed_admin = match (get(SEED_ADMIN_EMAIL_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteSeedAdmin),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_num(PORT_ENV, get(PORT_ENV), 8080)?,
            data_dir: get(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string()),
            jwt_secret,
            jwt_secret_generated,
            token_ttl: parse_secs(JWT_TTL_ENV, get(JWT_TTL_ENV), DEFAULT_TOKEN_TTL)?,
            session_ttl: parse_secs(SESSION_TTL_ENV, get(SESSION_TTL_ENV), DEFAULT_SESSION_TTL)?,
            rate_limit,
            seed_admin,
        })
    }

    /// Configuration for tests: fixed secret, everything else default.
    pub fn for_tests(data_dir: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: data_dir.into(),
            jwt_secret: b"test-secret-test-secret-test-secret!".to_vec(),
            jwt_secret_generated: false,
            token_ttl: DEFAULT_TOKEN_TTL,
            session_ttl: DEFAULT_SESSION_TTL,
            rate_limit: RateLimitConfig::default(),
            seed_admin: None,
        }
    }
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; MIN_SECRET_LEN];
    OsRng.fill_bytes(&mut secret);
    secret
}

fn parse_num<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn parse_secs(name: &'static str, raw: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    parse_num(name, raw, default.as_secs()).map(Duration::from_secs)
}

fn parse_positive_secs(
    name: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match parse_secs(name, raw, default)? {
        d if d.is_zero() => Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
        }),
        d => Ok(d),
    }
}

fn parse_bool(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            name,
            value: raw.unwrap_or_default(),
        }),
    }
}
