use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

use crate::services::{QuoteCalculator, QuoteLimits, RepairJobLifecycle, TransitionPolicy};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_DATABASE_URL: &str = "sqlite://repair_desk.db?mode=rwc";
const CONFIG_DIR: &str = "config";

/// `database_url` value selecting the in-process store.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Quote costing parameters.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_quote_bounds", skip_on_field_errors = false))]
pub struct QuoteConfig {
    /// Sales tax applied to the subtotal (0.15 = 15%)
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: Decimal,

    /// Days a quote stays valid after it is generated
    #[serde(default = "default_validity_days")]
    #[validate(range(min = 1))]
    pub validity_days: i64,

    /// Labor rate offered when the technician does not enter one
    #[serde(default = "default_labor_rate")]
    #[validate(custom = "validate_positive")]
    pub default_labor_rate: Decimal,

    #[serde(default = "default_min_labor_hours")]
    #[validate(custom = "validate_positive")]
    pub min_labor_hours: Decimal,
    #[serde(default = "default_max_labor_hours")]
    pub max_labor_hours: Decimal,

    #[serde(default = "default_min_labor_rate")]
    #[validate(custom = "validate_positive")]
    pub min_labor_rate: Decimal,
    #[serde(default = "default_max_labor_rate")]
    pub max_labor_rate: Decimal,

    #[serde(default = "default_max_part_quantity")]
    #[validate(range(min = 1))]
    pub max_part_quantity: u32,

    #[serde(default = "default_min_unit_price")]
    #[validate(custom = "validate_positive")]
    pub min_unit_price: Decimal,
    #[serde(default = "default_max_unit_price")]
    pub max_unit_price: Decimal,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        let limits = QuoteLimits::default();
        Self {
            tax_rate: default_tax_rate(),
            validity_days: default_validity_days(),
            default_labor_rate: default_labor_rate(),
            min_labor_hours: limits.min_labor_hours,
            max_labor_hours: limits.max_labor_hours,
            min_labor_rate: limits.min_labor_rate,
            max_labor_rate: limits.max_labor_rate,
            max_part_quantity: limits.max_part_quantity,
            min_unit_price: limits.min_unit_price,
            max_unit_price: limits.max_unit_price,
        }
    }
}

impl QuoteConfig {
    pub fn limits(&self) -> QuoteLimits {
        QuoteLimits {
            min_labor_hours: self.min_labor_hours,
            max_labor_hours: self.max_labor_hours,
            min_labor_rate: self.min_labor_rate,
            max_labor_rate: self.max_labor_rate,
            max_part_quantity: self.max_part_quantity,
            min_unit_price: self.min_unit_price,
            max_unit_price: self.max_unit_price,
        }
    }
}

/// Status workflow behaviour.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub transition_policy: TransitionPolicy,

    /// Extra attempts after an optimistic-concurrency conflict
    #[serde(default = "default_conflict_retries")]
    #[validate(range(max = 5))]
    pub conflict_retries: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::default(),
            conflict_retries: default_conflict_retries(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL, or `memory` for the in-process store
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default)]
    #[validate]
    pub quotes: QuoteConfig,

    #[serde(default)]
    #[validate]
    pub workflow: WorkflowConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            quotes: QuoteConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn is_memory_store(&self) -> bool {
        self.database_url.eq_ignore_ascii_case(MEMORY_DATABASE_URL)
    }

    pub fn calculator(&self) -> QuoteCalculator {
        QuoteCalculator::new(self.quotes.limits(), self.quotes.tax_rate)
    }

    pub fn lifecycle(&self) -> RepairJobLifecycle {
        RepairJobLifecycle::new(self.workflow.transition_policy, self.quotes.validity_days)
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_tax_rate() -> Decimal {
    dec!(0.15)
}
fn default_validity_days() -> i64 {
    30
}
fn default_labor_rate() -> Decimal {
    dec!(750)
}
fn default_min_labor_hours() -> Decimal {
    QuoteLimits::default().min_labor_hours
}
fn default_max_labor_hours() -> Decimal {
    QuoteLimits::default().max_labor_hours
}
fn default_min_labor_rate() -> Decimal {
    QuoteLimits::default().min_labor_rate
}
fn default_max_labor_rate() -> Decimal {
    QuoteLimits::default().max_labor_rate
}
fn default_max_part_quantity() -> u32 {
    QuoteLimits::default().max_part_quantity
}
fn default_min_unit_price() -> Decimal {
    QuoteLimits::default().min_unit_price
}
fn default_max_unit_price() -> Decimal {
    QuoteLimits::default().max_unit_price
}

fn default_conflict_retries() -> u32 {
    1
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate > Decimal::ONE {
        let mut err = ValidationError::new("tax_rate");
        err.message = Some("tax_rate must be between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_quote_bounds(quotes: &QuoteConfig) -> Result<(), ValidationError> {
    let pairs = [
        ("labor_hours", quotes.min_labor_hours, quotes.max_labor_hours),
        ("labor_rate", quotes.min_labor_rate, quotes.max_labor_rate),
        ("unit_price", quotes.min_unit_price, quotes.max_unit_price),
    ];
    if let Some((name, _, _)) = pairs.iter().find(|(_, min, max)| min > max) {
        let mut err = ValidationError::new("bounds");
        err.message = Some(format!("min_{} must not exceed max_{}", name, name).into());
        return Err(err);
    }
    if quotes.default_labor_rate < quotes.min_labor_rate
        || quotes.default_labor_rate > quotes.max_labor_rate
    {
        let mut err = ValidationError::new("bounds");
        err.message = Some("default_labor_rate must lie within the labor rate bounds".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("repair_desk={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(CONFIG_DIR)
}

/// Same as [`load_config`] with the profile directory given explicitly.
pub fn load_config_from(config_dir: &str) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(config_dir).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", config_dir, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
