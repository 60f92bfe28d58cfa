//! Configuration File Loading
//!
//! Finds, loads, validates and saves configuration files. Missing files are
//! not an error: the loader falls back to defaults.

use super::Config;
use crate::danger::DangerRule;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file loader
pub struct ConfigLoader {
    /// Search paths for configuration files (without extension)
    search_paths: Vec<PathBuf>,
    /// Path of the file the configuration came from, if any
    current_path: Option<PathBuf>,
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    const ALL: [ConfigFormat; 2] = [ConfigFormat::Toml, ConfigFormat::Json];

    fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }

    /// Format implied by a file extension (TOML when unknown)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

impl ConfigLoader {
    /// Create a loader with the default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
            current_path: None,
        }
    }

    /// Load configuration from the default locations, falling back to defaults
    pub fn load() -> Result<Config> {
        let mut loader = Self::new();
        loader.load_or_default()
    }

    /// Load from the search paths, or return validated defaults
    pub fn load_or_default(&mut self) -> Result<Config> {
        match self.find_and_load()? {
            Some((path, config)) => {
                info!("Configuration loaded from {}", path.display());
                self.current_path = Some(path);
                Ok(config)
            }
            None => {
                debug!("No configuration file found, using defaults");
                let config = Config::default();
                Self::validate(&config)?;
                Ok(config)
            }
        }
    }

    /// Load and validate a specific configuration file
    pub fn load_from_path(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let config = Self::load_file(path, ConfigFormat::from_path(path))?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Save configuration, format chosen by extension
    pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let format = ConfigFormat::from_path(path);
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
        }
        .map_err(|reason| Error::ConfigSerializationFailed {
            format: format.name().to_string(),
            reason,
        })?;

        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(config: &Config) -> Result<()> {
        if config.coordinator.notification_capacity == 0 {
            return Err(invalid(
                "coordinator.notification_capacity",
                "Notification capacity must be greater than 0",
            ));
        }

        let panel = &config.panel;
        if !(panel.min_size > 0.0) {
            return Err(invalid("panel.min_size", "Minimum size must be positive"));
        }
        if !(panel.max_size >= panel.min_size) {
            return Err(invalid(
                "panel.max_size",
                "Maximum size cannot be smaller than minimum size",
            ));
        }
        if !(panel.min_size..=panel.max_size).contains(&panel.default_size) {
            return Err(invalid(
                "panel.default_size",
                "Default size must lie between minimum and maximum size",
            ));
        }

        if config.logging.level.trim().is_empty() {
            return Err(invalid("logging.level", "Log level cannot be empty"));
        }

        for (index, extra) in config.gate.extra_danger_patterns.iter().enumerate() {
            let field = format!("gate.extra_danger_patterns[{}]", index);
            if extra.warning.trim().is_empty() {
                return Err(invalid(&field, "Warning text cannot be empty"));
            }
            if let Err(e) = DangerRule::new(&extra.pattern, extra.warning.clone()) {
                return Err(invalid(&field, &e.to_string()));
            }
        }

        Ok(())
    }

    fn find_and_load(&self) -> Result<Option<(PathBuf, Config)>> {
        for base in &self.search_paths {
            for format in ConfigFormat::ALL {
                let path = base.with_extension(format.extension());
                if !path.exists() {
                    continue;
                }
                match Self::load_file(&path, format).and_then(|config| {
                    Self::validate(&config)?;
                    Ok(config)
                }) {
                    Ok(config) => return Ok(Some((path, config))),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }
        Ok(None)
    }

    fn load_file(path: &Path, format: ConfigFormat) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| Error::ConfigParseFailed {
            format: format.name().to_string(),
            reason,
        })
    }

    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mosaicmux").join("config"));
        }

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join("mosaicmux").join("config"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mosaicmux"));
        }

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join(".mosaicmux"));
        }

        paths
    }

    /// Path of the file the configuration was loaded from
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// List all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Clear all search paths and add a single base path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::ConfigValidationFailed {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
