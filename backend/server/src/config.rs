use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Secret {0} missing from /run/secrets and the environment")]
    MissingSecret(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub redis_prefix: String,
    pub admin_email: String,
    pub admin_password: String,
    pub session_secret: String,
    pub session_ttl_secs: i64,
    pub notify_webhook_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            redis_url: try_load("REDIS_URL", "redis://redis:6379")?,
            redis_prefix: try_load("REDIS_PREFIX", "raffle")?,
            admin_email: try_load("ADMIN_EMAIL", "admin@example.com")?,
            admin_password: read_secret("ADMIN_PASSWORD")?,
            session_secret: read_secret("SESSION_SECRET")?,
            session_ttl_secs: try_load("SESSION_TTL_SECS", "28800")?,
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}

fn read_secret(secret_name: &str) -> Result<String, ConfigError> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .or_else(|e| {
            warn!("Failed to read {secret_name} from file: {e}, trying environment");
            env::var(secret_name).map(|s| s.trim().to_string())
        })
        .ok()
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| ConfigError::MissingSecret(secret_name.to_string()))
}
