//! Analysis configuration.
//!
//! Every section has defaults matching the standard two-PAN experiment, so an
//! empty YAML document is a valid configuration.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::PanLayout;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub layout: LayoutConfig,
    pub parsing: ParsingConfig,
    pub run: RunConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Slot layout of the simulated network
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub devices_per_pan: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { devices_per_pan: 12 }
    }
}

/// Log format details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Substring that marks MAC-layer tags in trace and stat lines
    pub layer_marker: String,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self { layer_marker: "Mac".to_string() }
    }
}

/// Facts about how the simulation was run that the logs do not record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Duration used to turn delivered bytes into throughput
    #[serde(with = "humantime_serde")]
    pub sim_duration: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { sim_duration: Duration::from_secs(30) }
    }
}

/// Where run files are found
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub dir: PathBuf,
    /// File name prefixes, each analyzed as a separate scenario
    pub prefixes: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            prefixes: vec!["interference".to_string(), "non_interference".to_string()],
        }
    }
}

/// Where reports are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("analysis_output") }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid layout configuration: {0}")]
    InvalidLayout(String),
    #[error("Invalid parsing configuration: {0}")]
    InvalidParsing(String),
    #[error("Invalid input configuration: {0}")]
    InvalidInput(String),
}

impl AnalysisConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.layout.devices_per_pan == 0 {
            return Err(ValidationError::InvalidLayout(
                "devices_per_pan must be at least 1".to_string(),
            ));
        }
        if self.parsing.layer_marker.trim().is_empty() {
            return Err(ValidationError::InvalidParsing(
                "layer_marker cannot be empty".to_string(),
            ));
        }
        if self.input.prefixes.is_empty() {
            return Err(ValidationError::InvalidInput(
                "at least one file prefix is required".to_string(),
            ));
        }
        if let Some(prefix) = self.input.prefixes.iter().find(|p| p.trim().is_empty()) {
            return Err(ValidationError::InvalidInput(format!(
                "file prefix {:?} is blank",
                prefix
            )));
        }
        Ok(())
    }

    pub fn pan_layout(&self) -> PanLayout {
        PanLayout::new(self.layout.devices_per_pan)
    }
}

/// Load and validate configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<AnalysisConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .with_context(|| format!("Failed to open config file: {}", config_path.display()))?;
    let config: AnalysisConfig = serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

    config.validate()?;
    Ok(config)
}
