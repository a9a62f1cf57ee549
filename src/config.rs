//! Configuration system for the coupon status service.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `COUPONS_SERVER_HOST` - Server bind address
//! - `COUPONS_SERVER_PORT` - Server port
//! - `COUPONS_DATABASE_TYPE` - `sqlite` or `postgres`
//! - `COUPONS_DATABASE_URL` - Database connection URL
//! - `COUPONS_LOGGING_ENABLED` - Enable request/job logging
//! - `COUPONS_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `COUPONS_JOBS_ENABLED` - Run the interval scheduler
//! - `COUPONS_JOBS_RUN_ON_STARTUP` - Run one pass as soon as the scheduler starts
//! - `COUPONS_JOBS_INTERVAL_SECS` - Seconds between scheduled passes
//! - `COUPONS_JOBS_PASS_TIMEOUT_SECS` - Upper bound on a single pass
//! - `CRON_SECRET` - Shared secret required by the trigger endpoint

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use crate::errors::{CouponError, CouponResult};

/// Global configuration singleton.
static CONFIG: OnceLock<CouponsConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CouponsConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Status reconciliation scheduling
    pub jobs: JobsConfig,
    /// External trigger endpoint settings
    pub trigger: TriggerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://coupons.db?mode=rwc".to_string(),
            postgres_url: "postgres://localhost/coupons".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Connection URL for the selected backend.
    pub fn url(&self) -> CouponResult<&str> {
        let url = match self.db_type.as_str() {
            "sqlite" => self.sqlite_url.as_str(),
            "postgres" => self.postgres_url.as_str(),
            other => {
                return Err(CouponError::ConfigError(format!(
                    "unsupported database type: {other}"
                )))
            }
        };

        if url.trim().is_empty() {
            return Err(CouponError::ConfigError(format!(
                "no connection URL configured for database type '{}'",
                self.db_type
            )));
        }

        Ok(url)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
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

/// Reconciliation scheduling configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Run the interval scheduler at all
    pub enabled: bool,
    /// Run one pass immediately when the scheduler starts
    pub run_on_startup: bool,
    /// Seconds between scheduled passes (default: 30 minutes)
    pub interval_secs: u64,
    /// Upper bound on a single pass before it is abandoned
    pub pass_timeout_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            run_on_startup: true,
            interval_secs: 1800,
            pass_timeout_secs: 30,
        }
    }
}

impl JobsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }
}

/// Trigger endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Shared secret (empty disables the check; `env:VAR_NAME` reads it from `VAR_NAME`)
    pub secret: String,
}

impl TriggerConfig {
    /// The effective secret, or `None` when the trigger is open.
    pub fn resolved_secret(&self) -> CouponResult<Option<String>> {
        let raw = self.secret.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let secret = match raw.strip_prefix("env:") {
            Some(var) => env::var(var).map_err(|_| {
                CouponError::ConfigError(format!(
                    "trigger.secret refers to environment variable {var}, which is not set"
                ))
            })?,
            None => raw.to_string(),
        };

        if secret.is_empty() {
            Ok(None)
        } else {
            Ok(Some(secret))
        }
    }
}

impl CouponsConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> CouponResult<Self> {
        let defaults = CouponsConfig::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)
            .map_err(config_error)?
            .set_default("server.port", i64::from(defaults.server.port))
            .map_err(config_error)?
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_error)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_error)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_error)?
            .set_default("logging.enabled", defaults.logging.enabled)
            .map_err(config_error)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_error)?
            .set_default("jobs.enabled", defaults.jobs.enabled)
            .map_err(config_error)?
            .set_default("jobs.run_on_startup", defaults.jobs.run_on_startup)
            .map_err(config_error)?
            .set_default("jobs.interval_secs", defaults.jobs.interval_secs as i64)
            .map_err(config_error)?
            .set_default("jobs.pass_timeout_secs", defaults.jobs.pass_timeout_secs as i64)
            .map_err(config_error)?
            .set_default("trigger.secret", "")
            .map_err(config_error)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("COUPONS_SERVER_HOST").ok())
            .map_err(config_error)?
            .set_override_option("server.port", env_parsed::<i64>("COUPONS_SERVER_PORT"))
            .map_err(config_error)?
            .set_override_option("database.db_type", env::var("COUPONS_DATABASE_TYPE").ok())
            .map_err(config_error)?
            .set_override_option(
                "database.sqlite_url",
                env::var("COUPONS_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_error)?
            .set_override_option(
                "database.postgres_url",
                env::var("COUPONS_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_error)?
            .set_override_option(
                "logging.enabled",
                env_parsed::<bool>("COUPONS_LOGGING_ENABLED"),
            )
            .map_err(config_error)?
            .set_override_option("logging.level", env::var("COUPONS_LOG_LEVEL").ok())
            .map_err(config_error)?
            .set_override_option("jobs.enabled", env_parsed::<bool>("COUPONS_JOBS_ENABLED"))
            .map_err(config_error)?
            .set_override_option(
                "jobs.run_on_startup",
                env_parsed::<bool>("COUPONS_JOBS_RUN_ON_STARTUP"),
            )
            .map_err(config_error)?
            .set_override_option(
                "jobs.interval_secs",
                env_parsed::<i64>("COUPONS_JOBS_INTERVAL_SECS"),
            )
            .map_err(config_error)?
            .set_override_option(
                "jobs.pass_timeout_secs",
                env_parsed::<i64>("COUPONS_JOBS_PASS_TIMEOUT_SECS"),
            )
            .map_err(config_error)?
            .set_override_option("trigger.secret", env::var("CRON_SECRET").ok())
            .map_err(config_error)?;

        let settings = builder
            .build()
            .map_err(|e| CouponError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| CouponError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CouponResult<()> {
        if self.server.port == 0 {
            return Err(CouponError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(CouponError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }
        self.database.url()?;

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(CouponError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        if self.jobs.interval_secs == 0 {
            return Err(CouponError::ConfigError(
                "jobs.interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.jobs.pass_timeout_secs == 0 {
            return Err(CouponError::ConfigError(
                "jobs.pass_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn config_error(e: config::ConfigError) -> CouponError {
    CouponError::ConfigError(e.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> CouponResult<&'static CouponsConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = CouponsConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid.
    let _ = CONFIG.set(config);

    CONFIG
        .get()
        .ok_or_else(|| CouponError::ConfigError("configuration was not initialized".to_string()))
}

/// Initialize configuration explicitly.
///
/// Call this early in your application to catch configuration errors.
pub fn init_config() -> CouponResult<&'static CouponsConfig> {
    get_config()
}
