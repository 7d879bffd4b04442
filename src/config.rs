//! Settings for the command-line tool.
//!
//! Read from `pixelchain.toml` in the working directory, or from the file
//! named by `PIXELCHAIN_CONFIG`. Every field has a default, so the file and
//! any of its keys may be omitted.

use crate::codec::DEFAULT_JPEG_QUALITY;
use crate::core::error::{PixelchainError, PixelchainResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "PIXELCHAIN_CONFIG";

/// Settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pixelchain.toml";

/// Tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Quality for JPEG output, 1-100.
    pub jpeg_quality: u8,
    /// Whether `batch` descends into subdirectories.
    pub recursive: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            recursive: false,
        }
    }
}

impl Settings {
    /// Load from the configured location, falling back to defaults when
    /// there is no settings file.
    pub fn load() -> PixelchainResult<Self> {
        Self::load_from(&config_path())
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> PixelchainResult<Self> {
        if path.exists() {
            Self::from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a settings file that must exist.
    pub fn from_path(path: &Path) -> PixelchainResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML settings.
    pub fn from_toml_str(content: &str) -> PixelchainResult<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> PixelchainResult<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PixelchainError::Other(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Settings file location: `PIXELCHAIN_CONFIG` if set, else `./pixelchain.toml`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
