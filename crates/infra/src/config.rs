//! Runtime configuration, read from the process environment.
//!
//! | variable                 | default             |
//! |--------------------------|---------------------|
//! | `APP_ENV`                | `development`       |
//! | `BIND_ADDR`              | `0.0.0.0:5000`      |
//! | `JWT_SECRET`             | dev-only default    |
//! | `JWT_EXPIRE_MINUTES`     | 43200 (30 days)     |
//! | `FILE_UPLOAD_PATH`       | `./public/uploads`  |
//! | `MAX_FILE_UPLOAD`        | 1000000 bytes       |
//! | `RATE_LIMIT_MAX`         | 100                 |
//! | `RATE_LIMIT_WINDOW_SECS` | 600                 |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` / `ADMIN_NAME` | unset |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

const DEV_JWT_SECRET: &str = "craftmart-dev-secret";
const DEFAULT_JWT_EXPIRE_MINUTES: i64 = 30 * 24 * 60;
const DEFAULT_UPLOAD_DIR: &str = "./public/uploads";
const DEFAULT_MAX_UPLOAD: usize = 1_000_000;
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 600;
const DEFAULT_ADMIN_NAME: &str = "Administrator";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be set in production")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("ADMIN_EMAIL and ADMIN_PASSWORD must be set together")]
    IncompleteAdmin,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// A string that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window for one client.
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

/// Administrator account created at startup when missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: Secret,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub jwt_secret: Secret,
    pub jwt_ttl: chrono::Duration,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub rate_limit: RateLimitConfig,
    pub bootstrap_admin: Option<AdminSeed>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            bind_addr: default_bind_addr(),
            jwt_secret: Secret::new(DEV_JWT_SECRET),
            jwt_ttl: chrono::Duration::minutes(DEFAULT_JWT_EXPIRE_MINUTES),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD,
            rate_limit: RateLimitConfig::default(),
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment: Environment = parse_or(&get, "APP_ENV", Environment::Development)?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => Secret::new(secret),
            None if environment.is_production() => {
                return Err(ConfigError::Missing { var: "JWT_SECRET" });
            }
            None => {
                warn!("JWT_SECRET not set; using insecure dev default");
                Secret::new(DEV_JWT_SECRET)
            }
        };

        let bind_addr: SocketAddr = parse_or(&get, "BIND_ADDR", default_bind_addr())?;

        let jwt_minutes: i64 = parse_or(&get, "JWT_EXPIRE_MINUTES", DEFAULT_JWT_EXPIRE_MINUTES)?;
        if jwt_minutes <= 0 {
            return Err(invalid("JWT_EXPIRE_MINUTES", jwt_minutes, "must be positive"));
        }

        let max_upload_bytes: usize = parse_or(&get, "MAX_FILE_UPLOAD", DEFAULT_MAX_UPLOAD)?;
        if max_upload_bytes == 0 {
            return Err(invalid("MAX_FILE_UPLOAD", max_upload_bytes, "must be positive"));
        }

        let max_requests: u32 = parse_or(&get, "RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX)?;
        let window_secs: u64 =
            parse_or(&get, "RATE_LIMIT_WINDOW_SECS", DEFAULT_RATE_LIMIT_WINDOW_SECS)?;
        if max_requests == 0 {
            return Err(invalid("RATE_LIMIT_MAX", max_requests, "must be positive"));
        }
        if window_secs == 0 {
            return Err(invalid("RATE_LIMIT_WINDOW_SECS", window_secs, "must be positive"));
        }

        let bootstrap_admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                name: get("ADMIN_NAME").unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
                email,
                password: Secret::new(password),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteAdmin),
        };

        Ok(Self {
            environment,
            bind_addr,
            jwt_secret,
            jwt_ttl: chrono::Duration::minutes(jwt_minutes),
            upload_dir: get("FILE_UPLOAD_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes,
            rate_limit: RateLimitConfig {
                max_requests,
                window: Duration::from_secs(window_secs),
            },
            bootstrap_admin,
        })
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn invalid(var: &'static str, value: impl fmt::Display, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
