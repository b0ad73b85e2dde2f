//! Environment-variable configuration helpers shared by every `from_env()`.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

/// Read a required variable. Empty values count as missing.
pub fn required(var: &str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnvVar(var.to_string())),
    }
}

/// Read an optional string variable, falling back to `default`.
pub fn string_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read and parse an optional variable. A present but unparseable value is an error.
pub fn parse_or<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: v,
        }),
        _ => Ok(default),
    }
}

pub fn secs_or(var: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    parse_or(var, default_secs).map(Duration::from_secs)
}

/// Comma-separated list, trimmed, empty entries dropped.
pub fn list_or(var: &str, default: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => split_list(&v),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
