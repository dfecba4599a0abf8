// config.rs

use std::{env, net::SocketAddr};

use dotenv::dotenv;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error when required environment variable is not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    /// How many recent messages per business the inbox looks at
    pub inbox_window: usize,
    /// Buffer size of the realtime broadcast channel
    pub feed_capacity: usize,
}

impl AppConfig {
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_INBOX_WINDOW: usize = 50;
    pub const DEFAULT_FEED_CAPACITY: usize = 100;

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET_KEY")?,
            bind_addr: parsed(
                "BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], Self::DEFAULT_PORT)),
            )?,
            inbox_window: parsed("INBOX_WINDOW", Self::DEFAULT_INBOX_WINDOW)?,
            feed_capacity: parsed("FEED_CAPACITY", Self::DEFAULT_FEED_CAPACITY)?,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::EnvVarNotFound(key.to_string()))
}

fn parsed<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
