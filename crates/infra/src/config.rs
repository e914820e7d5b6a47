//! Configuration loading and representation.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory.

use std::net::SocketAddr;

use thiserror::Error;

use electra_inventory::{DEFAULT_LOW_STOCK_THRESHOLD, StockThresholds};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectraConfig {
    pub bind_addr: SocketAddr,
    pub thresholds: StockThresholds,
    /// Flat delivery fee added to every order, in minor units.
    pub delivery_fee: u64,
    /// When set, Postgres adapters replace the in-memory ones.
    pub database_url: Option<String>,
}

impl ElectraConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is the normal case in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr.parse().map_err(|e| ConfigError::Invalid {
            key: "BIND_ADDR",
            message: format!("{e}"),
        })?;

        let low_stock = match lookup("LOW_STOCK_THRESHOLD") {
            Some(v) => v.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
                key: "LOW_STOCK_THRESHOLD",
                message: e.to_string(),
            })?,
            None => DEFAULT_LOW_STOCK_THRESHOLD,
        };
        let thresholds = StockThresholds::new(low_stock).map_err(|e| ConfigError::Invalid {
            key: "LOW_STOCK_THRESHOLD",
            message: e.to_string(),
        })?;

        let delivery_fee = match lookup("DELIVERY_FEE") {
            Some(v) => v.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: "DELIVERY_FEE",
                message: e.to_string(),
            })?,
            None => 0,
        };

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        Ok(Self {
            bind_addr,
            thresholds,
            delivery_fee,
            database_url,
        })
    }
}
