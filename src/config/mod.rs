//! Configuration management for MosaicMux
//!
//! Configuration is a TOML (or JSON) document; every section and field is
//! optional and falls back to its default, so a partial file is valid.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for MosaicMux
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordination context configuration
    pub coordinator: CoordinatorConfig,

    /// Terminal panel configuration
    pub panel: PanelConfig,

    /// Command execution gate configuration
    pub gate: GateConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Coordination context configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Buffered notifications per subscriber before it starts lagging
    pub notification_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            notification_capacity: 256,
        }
    }
}

/// Terminal panel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Initial panel size in logical pixels
    pub default_size: f32,

    /// Smallest size the panel may be resized to
    pub min_size: f32,

    /// Largest size the panel may be resized to
    pub max_size: f32,

    /// Whether the panel starts visible
    pub start_visible: bool,

    /// Shell requested for sessions the panel creates itself
    pub default_shell: Option<PathBuf>,

    /// Working directory for sessions the panel creates itself
    pub default_working_directory: Option<PathBuf>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            default_size: 300.0,
            min_size: 100.0,
            max_size: 2000.0,
            start_visible: false,
            default_shell: None,
            default_working_directory: None,
        }
    }
}

/// How long a danger confirmation stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationPolicy {
    /// Confirmation is consumed by the next gated action
    #[default]
    SingleShot,
    /// Confirmation persists until explicitly cancelled or reset
    Sticky,
}

/// Extra dangerous-command pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DangerPatternConfig {
    /// Regular expression matched against each command line
    pub pattern: String,

    /// Warning shown when the pattern matches
    pub warning: String,
}

/// Command execution gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Confirmation lifetime for dangerous commands
    pub confirmation: ConfirmationPolicy,

    /// Ask the execution service to capture command output
    pub capture_output: bool,

    /// Patterns flagged in addition to the built-in ones
    pub extra_danger_patterns: Vec<DangerPatternConfig>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            confirmation: ConfirmationPolicy::SingleShot,
            capture_output: true,
            extra_danger_patterns: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level filter (overridden by `RUST_LOG`)
    pub level: String,

    /// Emit danger-gate audit records
    pub audit: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            audit: true,
        }
    }
}
