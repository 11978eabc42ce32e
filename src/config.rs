use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_OFFLINE_AFTER_SECS: u64 = 600;
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 10;

/// Terminal admin dashboard for container fleet clients.
#[derive(Parser, Debug, Default)]
#[command(name = "fleetdash", version, about)]
pub struct Cli {
    /// Poll interval in milliseconds (overrides the config file)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// JSON config file, e.g. {"intervalMs": 5000}
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run against simulated stats and containers
    #[arg(long)]
    pub demo: bool,

    /// Drop fetch results that resolve after the dashboard is disposed
    #[arg(long)]
    pub strict_teardown: bool,

    /// Seconds without a ping before a client is shown offline
    #[arg(long, default_value_t = DEFAULT_OFFLINE_AFTER_SECS)]
    pub offline_after_secs: u64,

    /// Seconds before an unanswered confirmation counts as declined
    #[arg(long, default_value_t = DEFAULT_CONFIRM_TIMEOUT_SECS)]
    pub confirm_timeout_secs: u64,

    /// Directory for the daily log file
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    interval_ms: Option<u64>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved runtime settings.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardConfig {
    pub interval: Duration,
    pub demo: bool,
    pub strict_teardown: bool,
    pub offline_after: Duration,
    pub confirm_timeout: Duration,
    pub log_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            demo: false,
            strict_teardown: false,
            offline_after: Duration::from_secs(DEFAULT_OFFLINE_AFTER_SECS),
            confirm_timeout: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl DashboardConfig {
    /// Merge command-line flags over the optional config file.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let interval_ms = cli.interval_ms.or(file.interval_ms).unwrap_or(DEFAULT_INTERVAL_MS);
        if interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(Self {
            interval: Duration::from_millis(interval_ms),
            demo: cli.demo,
            strict_teardown: cli.strict_teardown,
            offline_after: Duration::from_secs(cli.offline_after_secs),
            confirm_timeout: Duration::from_secs(cli.confirm_timeout_secs),
            log_dir: cli.log_dir.clone(),
        })
    }
}
