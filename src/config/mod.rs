use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub admin: Option<AdminConfig>,
    pub pagination: PaginationConfig,
    pub media: MediaConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

/// Staff account created (or promoted) on startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub reservations_page_size: u32,
}

/// Uploaded files are written under `root` and served from `/media`.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub root: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub enable_cache: bool,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

/// Longest accepted token lifetime (one year).
pub const MAX_JWT_EXPIRES_IN_HOURS: i64 = 24 * 365;

fn parsed_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn check_token_lifetime(hours: i64) -> Result<(), ConfigError> {
    if (1..=MAX_JWT_EXPIRES_IN_HOURS).contains(&hours) {
        Ok(())
    } else {
        Err(ConfigError::Invalid { name: "JWT_EXPIRES_IN_HOURS", value: hours.to_string() })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminConfig { email, password }),
            _ => None,
        };

        let reservations_page_size: u32 = parsed_or("RESERVATIONS_PAGE_SIZE", 10)?;
        if reservations_page_size == 0 {
            return Err(ConfigError::Invalid {
                name: "RESERVATIONS_PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        let expires_in_hours: i64 = parsed_or("JWT_EXPIRES_IN_HOURS", 24)?;
        check_token_lifetime(expires_in_hours)?;

        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed_or("PORT", 8000)?,
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "theater_api=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed_or("DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
                ttl_seconds: parsed_or("CACHE_TTL_SECONDS", 300)?,
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                expires_in_hours,
            },
            admin,
            pagination: PaginationConfig { reservations_page_size },
            media: MediaConfig {
                root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            },
            features: FeatureFlags {
                enable_cache: parsed_or("ENABLE_CACHE", true)?,
            },
        })
    }

    /// Whether Redis should be connected at all.
    pub fn cache_url(&self) -> Option<&str> {
        if self.features.enable_cache {
            self.redis.url.as_deref()
        } else {
            None
        }
    }
}
