use derive_getters::Getters;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
const DEV_CLIENT_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Process settings read from the environment (and `.env`, when loaded).
#[derive(Debug, Clone, Getters)]
pub struct Config {
    /// Uses the in-memory store when absent.
    database_url: Option<String>,
    port: u16,
    client_origin: Option<String>,
    low_stock_threshold: i32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url: text("DATABASE_URL"),
            port: number("PORT", text("PORT"), DEFAULT_PORT)?,
            client_origin: text("CLIENT_ORIGIN"),
            low_stock_threshold: number(
                "LOW_STOCK_THRESHOLD",
                text("LOW_STOCK_THRESHOLD"),
                DEFAULT_LOW_STOCK_THRESHOLD,
            )?,
        })
    }

    /// Origins the browser UI may call from.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![DEV_CLIENT_ORIGIN.to_string()];
        if let Some(origin) = &self.client_origin {
            if origin != DEV_CLIENT_ORIGIN {
                origins.push(origin.clone());
            }
        }
        origins
    }
}

fn number<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
