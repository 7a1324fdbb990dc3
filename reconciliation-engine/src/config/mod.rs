//! Configuration module for the reconciliation engine.

use engine_core::config as core_config;
use engine_core::error::AppError;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Absent means the backend tier is disabled and the engine runs on
    /// the memory and local tiers alone.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory for the locally persisted tier; absent disables it.
    pub local_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let common = core_config::Config::load()?;

        Ok(Self {
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "reconciliation-engine".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| common.log_level.clone()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            cache: CacheConfig {
                local_dir: env::var("CACHE_LOCAL_DIR").ok().map(PathBuf::from),
            },
            common,
        })
    }
}
