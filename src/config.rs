use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

use crate::calendar::Subdivision;
use crate::generator::GeneratorConfig;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_DATABASE_URL: &str = "sqlite://library_dw.db?mode=rwc";
const CONFIG_DIR: &str = "config";
const DEFAULT_INPUT_DIR: &str = ".";
const DEFAULT_BATCH_SIZE: usize = 5_000;
const DEFAULT_COMMIT_EVERY: usize = 20_000;
const DEFAULT_COUNTRY: &str = "MY";
const DEFAULT_SUBDIVISION: &str = "KUL";
const DEFAULT_STAGING_TABLE: &str = "date_dim_holiday_stage";
const DEFAULT_EVENT_MAX_LEN: usize = 50;

/// Bulk loader configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Directory holding the fact CSV files
    pub input_dir: PathBuf,

    /// Rows per multi-row INSERT
    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// Pending rows that trigger an intermediate commit
    #[validate(range(min = 1))]
    pub commit_every: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            batch_size: DEFAULT_BATCH_SIZE,
            commit_every: DEFAULT_COMMIT_EVERY,
        }
    }
}

/// Holiday merge configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct HolidayConfig {
    /// ISO country code; only "MY" is supported
    #[validate(custom = "validate_country")]
    pub country: String,

    /// ISO 3166-2 subdivision code, e.g. "KUL"
    #[validate(custom = "validate_subdivision")]
    pub subdivision: String,

    /// Name of the transient staging table
    #[validate(custom = "validate_identifier")]
    pub staging_table: String,

    /// Maximum characters kept from a holiday name
    #[validate(range(min = 1, max = 50))]
    pub event_max_len: usize,

    /// Optional `date,name` CSV of holidays the rule-based calendar does not cover
    pub extra_holidays_file: Option<PathBuf>,
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            country: DEFAULT_COUNTRY.to_string(),
            subdivision: DEFAULT_SUBDIVISION.to_string(),
            staging_table: DEFAULT_STAGING_TABLE.to_string(),
            event_max_len: DEFAULT_EVENT_MAX_LEN,
            extra_holidays_file: None,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// URL for the direct single-connection fallback; the primary URL when absent
    #[serde(default)]
    pub fallback_database_url: Option<String>,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations before every command
    #[serde(default)]
    pub auto_migrate: bool,

    // ========== Database Pool Configuration ==========
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    // ========== Pipeline Sections ==========
    #[serde(default)]
    #[validate]
    pub generator: GeneratorConfig,

    #[serde(default)]
    #[validate]
    pub loader: LoaderConfig,

    #[serde(default)]
    #[validate]
    pub holidays: HolidayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            fallback_database_url: None,
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            generator: GeneratorConfig::default(),
            loader: LoaderConfig::default(),
            holidays: HolidayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// URL used by the direct fallback connection
    pub fn fallback_database_url(&self) -> &str {
        self.fallback_database_url
            .as_deref()
            .unwrap_or(&self.database_url)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
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

fn validate_country(country: &str) -> Result<(), ValidationError> {
    if country.eq_ignore_ascii_case(DEFAULT_COUNTRY) {
        Ok(())
    } else {
        let mut err = ValidationError::new("country");
        err.message = Some("Only MY (Malaysia) holidays are supported".into());
        Err(err)
    }
}

fn validate_subdivision(code: &str) -> Result<(), ValidationError> {
    Subdivision::from_str(code).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("subdivision");
        err.message = Some(format!("Unknown Malaysian subdivision code '{}'", code).into());
        err
    })
}

/// Staging table names are spliced into DDL, so only plain identifiers are accepted.
pub(crate) fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 63;

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("identifier");
        err.message = Some(format!("'{}' is not a valid table name", name).into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("library_dw={},sea_orm=warn,sqlx=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*, nested with `__`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_profile(None)
}

/// Like [`load_config`], with an explicit profile taking precedence over RUN_ENV/APP_ENV
pub fn load_profile(profile: Option<&str>) -> Result<AppConfig, AppConfigError> {
    let run_env = match profile {
        Some(profile) => profile.to_string(),
        None => env::var("RUN_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| DEFAULT_ENV.to_string()),
    };
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads configuration from `config_dir` for the `run_env` profile
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(run_env)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerationMode;
    use std::fs;
    use tempfile::TempDir;

    fn config_dir_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.loader.batch_size, 5_000);
        assert_eq!(config.loader.commit_every, 20_000);
        assert_eq!(config.holidays.staging_table, "date_dim_holiday_stage");
        assert_eq!(config.fallback_database_url(), config.database_url());
    }

    #[test]
    fn files_layer_over_defaults() {
        let dir = config_dir_with(&[
            (
                "default.toml",
                r#"
                database_url = "sqlite://default.db?mode=rwc"
                log_level = "debug"

                [generator]
                seed = 7
                mode = "weighted_phase"

                [loader]
                batch_size = 100
                "#,
            ),
            (
                "staging.toml",
                r#"
                database_url = "sqlite://staging.db?mode=rwc"

                [holidays]
                subdivision = "SGR"
                "#,
            ),
        ]);

        let config = load_config_from(dir.path(), "staging").unwrap();

        assert_eq!(config.database_url, "sqlite://staging.db?mode=rwc");
        assert_eq!(config.environment, "staging");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.generator.seed, Some(7));
        assert_eq!(config.generator.mode, GenerationMode::WeightedPhase);
        assert_eq!(config.loader.batch_size, 100);
        assert_eq!(config.loader.commit_every, 20_000);
        assert_eq!(config.holidays.subdivision, "SGR");
    }

    #[test]
    fn missing_directory_uses_built_in_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("absent"), "test").unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.holidays.country, "MY");
    }

    #[test]
    fn validation_failure() {
        let dir = config_dir_with(&[(
            "default.toml",
            r#"
            log_level = "loud"

            [loader]
            batch_size = 0

            [holidays]
            staging_table = "stage; drop table date_dim"
            "#,
        )]);

        let result = load_config_from(dir.path(), "development");
        assert!(matches!(result, Err(AppConfigError::Validation(_))));
    }

    #[test]
    fn unknown_subdivision_rejected() {
        let mut config = AppConfig::default();
        config.holidays.subdivision = "ZZZ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn identifiers() {
        assert!(validate_identifier("date_dim_holiday_stage").is_ok());
        assert!(validate_identifier("_tmp1").is_ok());
        assert!(validate_identifier("1stage").is_err());
        assert!(validate_identifier("stage-2").is_err());
        assert!(validate_identifier("").is_err());
    }
}
