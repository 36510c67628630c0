use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Application configuration loaded from environment variables.
/// Every setting has a default, so an empty environment talks to a local backend.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub download_dir: PathBuf,
    pub extraction_timeout: Duration,
    pub http_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            backend_url: env_or("BACKEND_URL", DEFAULT_BACKEND_URL),
            download_dir: PathBuf::from(env_or("DOWNLOAD_DIR", ".")),
            extraction_timeout: Duration::from_millis(parse_env("EXTRACTION_TIMEOUT_MS", 5000)?),
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 120)?),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_padded_integers() {
        let value: u64 = parse_value("EXTRACTION_TIMEOUT_MS", " 2500 ").unwrap();
        assert_eq!(value, 2500);
    }

    #[test]
    fn test_parse_value_names_the_variable_on_error() {
        let err = parse_value::<u64>("HTTP_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("HTTP_TIMEOUT_SECS"));
    }
}
