use crate::error::ConfigError;
use crate::models::config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration manager for till settings and the price list
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the platform config directory (`<config_dir>/bakery-pos`)
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("bakery-pos");

        Ok(Self::with_dir(config_dir))
    }

    /// Manager rooted at an explicit directory
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config_path = config_dir.join("config.json");
        Self {
            config_dir,
            config_path,
        }
    }

    /// Manager for an explicit config file
    pub fn with_file(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            config_dir,
            config_path,
        }
    }

    /// Save configuration to disk as pretty JSON
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if !self.config_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
                path: self.config_dir.display().to_string(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(config)?;

        fs::write(&self.config_path, json).map_err(|source| ConfigError::Io {
            path: self.config_path.display().to_string(),
            source,
        })?;

        debug!(path = %self.config_path.display(), "config saved");
        Ok(())
    }

    /// Load and validate configuration.
    ///
    /// A missing file yields the default configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_exists() {
            debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Io {
            path: self.config_path.display().to_string(),
            source,
        })?;

        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn config_file_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}
