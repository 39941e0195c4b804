// src/config.rs

use std::env;

use dotenvy::dotenv;
use thiserror::Error;

/// Number of characters at which an open-ended answer earns full credit.
pub const OPEN_ENDED_FULL_CREDIT_CHARS: usize = 100;

/// An open-ended answer counts as correct when its credit fraction exceeds this.
pub const OPEN_ENDED_CORRECT_FRACTION: f64 = 0.5;

/// Scores are reported on a 0..=SCORE_SCALE scale.
pub const SCORE_SCALE: f64 = 10.0;

/// Attempt cap used when an assessment does not carry a usable one.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 2;

/// How many times `start_attempt` retries after losing a numbering race.
pub const ATTEMPT_NUMBER_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    pub default_max_attempts: i32,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = parsed("PORT", 3000)?;

        let default_max_attempts = parsed("DEFAULT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if default_max_attempts < 1 {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_MAX_ATTEMPTS",
                value: default_max_attempts.to_string(),
            });
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            port,
            default_max_attempts,
            cors_origins,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}
