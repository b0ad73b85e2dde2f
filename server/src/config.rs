use std::net::SocketAddr;

use clipchef_core::config::{self, ConfigError};

pub const DEFAULT_DB_POOL_SIZE: u32 = 10;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_pool_size: u32,
}

impl ServerConfig {
    /// Required: `DATABASE_URL`.
    /// Optional: `CLIPCHEF_BIND_ADDR` (default 0.0.0.0:3000),
    /// `CLIPCHEF_DB_POOL_SIZE` (default 10).
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: config::required("DATABASE_URL")?,
            bind_addr: config::parse_or(
                "CLIPCHEF_BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 3000)),
            )?,
            db_pool_size: config::parse_or("CLIPCHEF_DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?.max(1),
        })
    }
}
