// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration for the frame exchange.
//!
//! Both ends of an exchange must agree on the base directory. Invalid
//! values fail at load time rather than on the first write.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default shared-memory-backed directory.
pub const DEFAULT_BASE_DIR: &str = "/dev/shm";

/// Default permission bits for frame files.
pub const DEFAULT_FILE_MODE: u32 = 0o600;

/// Raw exchange configuration as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawExchangeConfig {
    #[serde(default = "default_base_dir")]
    base_dir: String,
    #[serde(default = "default_file_mode")]
    file_mode: u32,
}

fn default_base_dir() -> String {
    DEFAULT_BASE_DIR.to_string()
}

fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

impl Default for RawExchangeConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            file_mode: default_file_mode(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    exchange: RawExchangeConfig,
}

/// Validated exchange configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Directory frame files are created in. Absolute.
    pub base_dir: PathBuf,
    /// Permission bits for new frame files.
    pub file_mode: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            file_mode: DEFAULT_FILE_MODE,
        }
    }
}

impl ExchangeConfig {
    /// Default settings with a different, validated base directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self {
            base_dir: base_dir.into(),
            ..Self::default()
        };
        ConfigLoader::validate_base_dir(&config.base_dir)?;
        Ok(config)
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<ExchangeConfig, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> Result<ExchangeConfig, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            message: format!("YAML parse error: {}", e),
        })?;

        Self::validate(raw.exchange)
    }

    fn validate(raw: RawExchangeConfig) -> Result<ExchangeConfig, ConfigError> {
        let base_dir = PathBuf::from(raw.base_dir);
        Self::validate_base_dir(&base_dir)?;

        if raw.file_mode > 0o777 {
            return Err(ConfigError::InvalidFieldValue {
                field: "file_mode",
                value: format!("{:o}", raw.file_mode),
                reason: "Only permission bits (0o777) are allowed".to_string(),
            });
        }

        // Frames are opened read-write by both ends
        if raw.file_mode & 0o600 != 0o600 {
            return Err(ConfigError::InvalidFieldValue {
                field: "file_mode",
                value: format!("{:o}", raw.file_mode),
                reason: "Owner must have read and write permission".to_string(),
            });
        }

        tracing::debug!(
            base_dir = %base_dir.display(),
            file_mode = %format!("{:o}", raw.file_mode),
            "Exchange configuration validated"
        );

        Ok(ExchangeConfig {
            base_dir,
            file_mode: raw.file_mode,
        })
    }

    fn validate_base_dir(base_dir: &Path) -> Result<(), ConfigError> {
        if !base_dir.is_absolute() {
            return Err(ConfigError::InvalidFieldValue {
                field: "base_dir",
                value: base_dir.display().to_string(),
                reason: "Base directory must be an absolute path".to_string(),
            });
        }

        // Handles under it travel as text
        if base_dir.to_str().is_none() {
            return Err(ConfigError::InvalidFieldValue {
                field: "base_dir",
                value: base_dir.display().to_string(),
                reason: "Base directory must be valid UTF-8".to_string(),
            });
        }

        if !base_dir.is_dir() {
            return Err(ConfigError::InvalidFieldValue {
                field: "base_dir",
                value: base_dir.display().to_string(),
                reason: "Base directory does not exist or is not a directory".to_string(),
            });
        }

        Ok(())
    }
}
