//! Common configuration types shared across dirkit crates

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// What to do with each extracted movie
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Default `tracing` directive when `RUST_LOG` is unset
    pub log_level: String,
    /// Root directory for dumped resources
    pub output_dir: PathBuf,
    /// Directory holding the built-in palette tables (`SystemWin.json`, ...)
    pub palettes_dir: Option<PathBuf>,
    /// Write each resource's bytes to `<output>/<movie>/<TAG>/<id>.bin`
    pub dump_resources: bool,
    /// Convert BITD resources with known cast metadata to PNG
    pub export_bitmaps: bool,
    /// Write `map.json` next to the dumped resources
    pub write_map: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            output_dir: std::env::current_dir()
                .unwrap_or_default()
                .join("dump"),
            palettes_dir: None,
            dump_resources: false,
            export_bitmaps: false,
            write_map: true,
        }
    }
}

impl ExtractConfig {
    /// Parse a config from TOML text. Missing keys fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Output directory for one movie, named after its file
    pub fn movie_dir(&self, movie_path: &Path) -> PathBuf {
        let name = movie_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "movie".to_string());
        self.output_dir.join(name)
    }
}
