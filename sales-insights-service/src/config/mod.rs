//! Configuration module for sales-insights-service.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SalesInsightsConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    /// Currency reported when the outstanding lookup fails.
    pub fallback_currency: String,
    /// How long a company's default currency is cached.
    pub currency_cache_ttl: Duration,
    /// Directory served under `/assets/<app>/`.
    pub assets_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub capacity: usize,
    pub short_workers: usize,
    pub default_workers: usize,
    pub long_workers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            short_workers: 2,
            default_workers: 1,
            long_workers: 1,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl SalesInsightsConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let queue_defaults = QueueConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "sales-insights-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", 2),
            },
            queue: QueueConfig {
                capacity: env_or("QUEUE_CAPACITY", queue_defaults.capacity).max(1),
                short_workers: env_or("QUEUE_SHORT_WORKERS", queue_defaults.short_workers).max(1),
                default_workers: env_or("QUEUE_DEFAULT_WORKERS", queue_defaults.default_workers)
                    .max(1),
                long_workers: env_or("QUEUE_LONG_WORKERS", queue_defaults.long_workers).max(1),
            },
            fallback_currency: env::var("FALLBACK_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
            currency_cache_ttl: Duration::from_secs(env_or("CURRENCY_CACHE_TTL_SECS", 300)),
            assets_dir: env::var("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),
        })
    }
}
