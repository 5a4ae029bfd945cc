//! Configuration resolution for idv-verify
//!
//! Adds the command-line layer on top of [`TomlConfig::load`], giving the full
//! priority order: CLI → ENV → TOML → defaults.

use clap::Parser;
use idv_common::config::{write_toml_config, TomlConfig};
use idv_common::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for idv-verify
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "idv-verify")]
#[command(about = "Identity candidate ranking and face verification service")]
#[command(version)]
pub struct Args {
    /// Config file (defaults to IDV_CONFIG, then <config dir>/idv/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Identity dataset JSON file
    #[arg(short, long)]
    pub data_file: Option<PathBuf>,

    /// HTTP listen address, e.g. 127.0.0.1:5740
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Face comparison service base URL
    #[arg(long)]
    pub compare_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write the resolved configuration to this path and exit
    #[arg(long)]
    pub write_config: Option<PathBuf>,
}

impl Args {
    /// Overlay command-line values onto a loaded config
    pub fn apply_to(&self, config: &mut TomlConfig) {
        if let Some(path) = &self.data_file {
            config.data_file = Some(path.clone());
        }
        if let Some(bind) = &self.bind {
            config.bind_address = bind.clone();
        }
        if let Some(url) = &self.compare_url {
            config.comparison.base_url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub toml: TomlConfig,
    pub data_file: PathBuf,
}

/// Resolve configuration from all tiers
///
/// Fails when no dataset file is configured anywhere, or when the merged
/// values do not validate.
pub fn resolve(args: &Args) -> Result<ResolvedConfig> {
    let mut toml = TomlConfig::load(args.config.as_deref())?;
    args.apply_to(&mut toml);
    toml.validate()?;

    let data_file = toml.data_file.clone().ok_or_else(|| {
        Error::Config(
            "No identity data file configured. Use --data-file, IDV_DATA_FILE or data_file in config.toml"
                .to_string(),
        )
    })?;

    Ok(ResolvedConfig { toml, data_file })
}

/// Handle `--write-config`: persist the merged settings
pub fn write_resolved(args: &Args, path: &std::path::Path) -> Result<()> {
    let mut toml = TomlConfig::load(args.config.as_deref())?;
    args.apply_to(&mut toml);
    toml.validate()?;
    write_toml_config(&toml, path)?;
    info!("Configuration written to {}", path.display());
    Ok(())
}
