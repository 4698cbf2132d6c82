use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::{FilterError, FilterParameters, ParameterRanges, Preset};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Settings for a [`crate::FilterManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub parameters: FilterParameters,
    pub ranges: ParameterRanges,
    #[serde(alias = "confidenceThreshold", alias = "min_confidence")]
    pub confidence_threshold: f64,
    pub enabled: bool,
    /// Applied on top of `parameters` at startup.
    pub preset: Option<Preset>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            parameters: FilterParameters::default(),
            ranges: ParameterRanges::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            enabled: true,
            preset: None,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), FilterError> {
        self.ranges.check()?;
        check_confidence_threshold(self.confidence_threshold)?;

        let result = self.parameters.validate(&self.ranges);
        if !result.is_valid {
            return Err(FilterError::configuration(
                "parameters",
                result.errors.join("; "),
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_confidence_threshold(threshold: f64) -> Result<(), FilterError> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(FilterError::configuration(
            "confidenceThreshold",
            format!("must be between 0 and 1 (got {})", threshold),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum InputMode {
    #[serde(alias = "stdin", alias = "Ndjson")]
    #[default]
    Stdin,
    #[serde(alias = "udp", alias = "UDP")]
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum OutputMode {
    #[serde(alias = "stdout", alias = "Ndjson")]
    #[default]
    Stdout,
    #[serde(alias = "udp", alias = "UDP", alias = "GenericUDP")]
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub filter: FilterConfig,

    #[serde(alias = "input_mode")]
    pub input: InputMode,
    #[serde(alias = "output_mode")]
    pub output: OutputMode,
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_send_address")]
    pub send_address: String,

    /// Frames between two stats log lines; 0 disables periodic logging.
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,

    /// Where the final manager configuration is written on shutdown.
    pub export_path: Option<PathBuf>,
}

fn default_listen_address() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_send_address() -> String {
    "127.0.0.1:9101".to_string()
}

fn default_stats_interval() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            input: InputMode::default(),
            output: OutputMode::default(),
            listen_address: default_listen_address(),
            send_address: default_send_address(),
            stats_interval: default_stats_interval(),
            export_path: None,
        }
    }
}

impl AppConfig {
    /// Reads the config at `path`, writing the defaults there first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading config from {:?}", path);
            let file = fs::File::open(path)
                .with_context(|| format!("Failed to open config file {:?}", path))?;
            let config: AppConfig = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file {:?}", path))?;
            config
                .filter
                .validate()
                .context("Config contains invalid filter settings")?;
            Ok(config)
        } else {
            info!("Config not found. Creating default at {:?}", path);
            let config = AppConfig::default();
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create config file {:?}", path))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &config)
                .context("Failed to serialize default config")?;
            Ok(config)
        }
    }
}
