//! Startup configuration.
//!
//! Loaded once from a JSON file. Every key is optional; unknown keys are
//! rejected so that typos do not silently fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::StreetboxError;
use crate::export::NamingStrategy;
use crate::pipeline::DEFAULT_DEBOUNCE;

/// Label offered when no vocabulary is configured.
pub const DEFAULT_LABEL: &str = "transformer";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Credential for the map collaborator. Not used by the pipeline itself.
    #[serde(default)]
    pub google_maps_api_key: Option<String>,

    /// Label vocabulary offered to the operator.
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    /// Device pixel density multiplier for cropped output.
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,

    /// Coalescing window for crop adjustments, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub naming: NamingStrategy,

    /// Clear entries after each successful export.
    #[serde(default)]
    pub single_shot: bool,

    /// Directory export pairs are written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            labels: default_labels(),
            pixel_ratio: default_pixel_ratio(),
            debounce_ms: default_debounce_ms(),
            naming: NamingStrategy::default(),
            single_shot: false,
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, StreetboxError> {
        let raw = fs::read_to_string(path).map_err(StreetboxError::Io)?;
        serde_json::from_str(&raw).map_err(|source| StreetboxError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn is_known_label(&self, label: &str) -> bool {
        self.labels.iter().any(|known| known == label)
    }
}

fn default_labels() -> Vec<String> {
    vec![DEFAULT_LABEL.to_string()]
}

fn default_pixel_ratio() -> f64 {
    1.0
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
