//! Configuration for the license summary worker.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `LICENSE_SUMMARY_STORE_BACKEND` - Store backend (`memory` or `sqlite`)
//! - `LICENSE_SUMMARY_DATABASE_URL` - SQLite connection URL
//! - `LICENSE_SUMMARY_COLLECTION` - Collection holding license records
//! - `LICENSE_SUMMARY_REFRESH_ENABLED` - Enable the periodic refresh job
//! - `LICENSE_SUMMARY_REFRESH_CRON` - Cron expression for the refresh job
//! - `LICENSE_SUMMARY_LOGGING_ENABLED` - Enable logging
//! - `LICENSE_SUMMARY_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{LicenseError, LicenseResult};
use crate::logging::parse_level;
use crate::validation::validate_record_key;

/// Global configuration singleton.
static CONFIG: OnceLock<SummaryConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub store: StoreConfig,
    pub refresh: RefreshConfig,
    pub logging: LoggingConfig,
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend: "memory" or "sqlite"
    pub backend: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// Collection (top-level path) holding license records
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            sqlite_url: "sqlite://licenses.db".to_string(),
            collection: "licenses".to_string(),
        }
    }
}

/// Periodic refresh configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub enabled: bool,
    /// Cron expression with seconds field (default: every hour at minute 0)
    pub cron: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: "0 0 * * * *".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> LicenseError {
    LicenseError::ConfigError(e.to_string())
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| v.parse::<bool>().ok())
}

impl SummaryConfig {
    fn defaults() -> LicenseResult<ConfigBuilder<DefaultState>> {
        let defaults = SummaryConfig::default();
        Config::builder()
            .set_default("store.backend", defaults.store.backend)
            .map_err(config_err)?
            .set_default("store.sqlite_url", defaults.store.sqlite_url)
            .map_err(config_err)?
            .set_default("store.collection", defaults.store.collection)
            .map_err(config_err)?
            .set_default("refresh.enabled", defaults.refresh.enabled)
            .map_err(config_err)?
            .set_default("refresh.cron", defaults.refresh.cron)
            .map_err(config_err)?
            .set_default("logging.enabled", defaults.logging.enabled)
            .map_err(config_err)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_err)
    }

    fn with_env_overrides(
        builder: ConfigBuilder<DefaultState>,
    ) -> LicenseResult<ConfigBuilder<DefaultState>> {
        builder
            .set_override_option("store.backend", env::var("LICENSE_SUMMARY_STORE_BACKEND").ok())
            .map_err(config_err)?
            .set_override_option("store.sqlite_url", env::var("LICENSE_SUMMARY_DATABASE_URL").ok())
            .map_err(config_err)?
            .set_override_option("store.collection", env::var("LICENSE_SUMMARY_COLLECTION").ok())
            .map_err(config_err)?
            .set_override_option(
                "refresh.enabled",
                env_bool("LICENSE_SUMMARY_REFRESH_ENABLED"),
            )
            .map_err(config_err)?
            .set_override_option("refresh.cron", env::var("LICENSE_SUMMARY_REFRESH_CRON").ok())
            .map_err(config_err)?
            .set_override_option(
                "logging.enabled",
                env_bool("LICENSE_SUMMARY_LOGGING_ENABLED"),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("LICENSE_SUMMARY_LOG_LEVEL").ok())
            .map_err(config_err)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> LicenseResult<Self> {
        let settings = builder
            .build()
            .map_err(|e| LicenseError::ConfigError(format!("failed to build config: {e}")))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| LicenseError::ConfigError(format!("failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the optional `config.toml` in the working directory, then the environment.
    pub fn load() -> LicenseResult<Self> {
        let builder = Self::defaults()?
            .add_source(config::File::with_name("config").required(false));
        Self::build(Self::with_env_overrides(builder)?)
    }

    /// Load from an explicit file (which must exist), then the environment.
    pub fn load_from(path: &str) -> LicenseResult<Self> {
        let builder = Self::defaults()?.add_source(config::File::with_name(path).required(true));
        Self::build(Self::with_env_overrides(builder)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> LicenseResult<()> {
        match self.store.backend.as_str() {
            "memory" | "sqlite" => {}
            other => {
                return Err(LicenseError::ConfigError(format!(
                    "store.backend must be 'memory' or 'sqlite', got '{other}'"
                )));
            }
        }

        if self.store.backend == "sqlite" && self.store.sqlite_url.is_empty() {
            return Err(LicenseError::ConfigError(
                "store.sqlite_url cannot be empty with the sqlite backend".to_string(),
            ));
        }

        validate_record_key(&self.store.collection)
            .map_err(|e| LicenseError::ConfigError(format!("store.collection: {e}")))?;

        if self.refresh.enabled && self.refresh.cron.trim().is_empty() {
            return Err(LicenseError::ConfigError(
                "refresh.cron is required when refresh.enabled is true".to_string(),
            ));
        }

        parse_level(&self.logging.level)?;

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
pub fn get_config() -> LicenseResult<&'static SummaryConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = SummaryConfig::load()?;

    // Another thread may have won the race; either value is fine.
    let _ = CONFIG.set(config);
    CONFIG
        .get()
        .ok_or_else(|| LicenseError::ConfigError("configuration was not initialized".to_string()))
}

/// Initialize configuration explicitly.
///
/// Call this early to surface configuration errors at startup.
pub fn init_config() -> LicenseResult<&'static SummaryConfig> {
    get_config()
}
