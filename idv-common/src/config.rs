//! Configuration loading and resolution
//!
//! Bootstrap settings come from a TOML file. Values are resolved in priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable (`IDV_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: defaults are used and a warning is logged.
//! A config file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "IDV_CONFIG";
/// Environment override for the dataset file
pub const ENV_DATA_FILE: &str = "IDV_DATA_FILE";
/// Environment override for the HTTP bind address
pub const ENV_BIND_ADDRESS: &str = "IDV_BIND_ADDRESS";
/// Environment override for the face comparison service URL
pub const ENV_COMPARE_URL: &str = "IDV_COMPARE_URL";
/// Environment override for the log level
pub const ENV_LOG_LEVEL: &str = "IDV_LOG_LEVEL";

/// Order of the three numeric components of a textual date
///
/// The observed ID data writes dates as `MM/DD/YYYY`, but literals such as
/// `10/12/2001` are ambiguous, so the order is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// `MM/DD/YYYY`
    #[default]
    MonthDayYear,
    /// `DD/MM/YYYY`
    DayMonthYear,
    /// `YYYY/MM/DD`
    YearMonthDay,
}

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The service must restart
/// to pick up changes to the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Dataset file (observed + online records)
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// HTTP listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Component order of birthdate strings
    #[serde(default)]
    pub date_order: DateOrder,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote face comparison service
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Face comparison client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Base URL of the comparison service (no trailing slash needed)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Minimum spacing between two requests
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Total attempts per candidate (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause before a retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Confidence at or above which a candidate passes (0-100)
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
}

fn default_bind_address() -> String {
    "127.0.0.1:5740".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_min_interval_ms() -> u64 {
    250
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_pass_threshold() -> f64 {
    50.0
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            min_interval_ms: default_min_interval_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            pass_threshold: default_pass_threshold(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            bind_address: default_bind_address(),
            date_order: DateOrder::default(),
            logging: LoggingConfig::default(),
            comparison: ComparisonConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Load configuration with file → environment resolution
    ///
    /// `cli_path` is the `--config` argument, if any. Command-line value overrides
    /// are applied afterwards by the caller.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!("Loading config file: {}", path.display());
                load_toml_config(&path)?
            }
            Some(path) => {
                if cli_path.is_some() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                TomlConfig::default()
            }
            None => {
                warn!("No config directory available, using built-in defaults");
                TomlConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `IDV_*` environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = env_value(ENV_DATA_FILE) {
            self.data_file = Some(PathBuf::from(path));
        }
        if let Some(addr) = env_value(ENV_BIND_ADDRESS) {
            self.bind_address = addr;
        }
        if let Some(url) = env_value(ENV_COMPARE_URL) {
            self.comparison.base_url = url;
        }
        if let Some(level) = env_value(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        let cmp = &self.comparison;
        if cmp.base_url.trim().is_empty() {
            return Err(Error::Config("comparison.base_url must not be empty".to_string()));
        }
        if cmp.max_attempts == 0 {
            return Err(Error::Config("comparison.max_attempts must be at least 1".to_string()));
        }
        if cmp.timeout_ms == 0 {
            return Err(Error::Config("comparison.timeout_ms must be positive".to_string()));
        }
        if !(0.0..=100.0).contains(&cmp.pass_threshold) {
            return Err(Error::Config(format!(
                "comparison.pass_threshold must be within 0-100, got {}",
                cmp.pass_threshold
            )));
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve which config file to read
///
/// Priority: `--config` argument, then `IDV_CONFIG`, then `<config_dir>/idv/config.toml`.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }

    default_config_path()
}

/// Platform config location (`~/.config/idv/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("idv").join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
