//! MosaicMux - terminal session multiplexer and gated command execution
//!
//! This library is the orchestration layer behind a block-based terminal:
//! it tracks interactive shell sessions spawned by an external terminal
//! service, keeps exactly one of them active, applies asynchronous
//! lifecycle events in order, and runs suggested command blocks through a
//! danger-confirmation gate before dispatching them to the active session.
//!
//! ## Module Organization
//!
//! ### Core
//!
//! - [`session`] - Session registry (tab order) and active-session selector
//! - [`gate`] - Per-block execution gate and danger confirmation
//! - [`panel`] - Terminal panel visibility and size
//! - [`multiplexer`] - Synchronous core composing the pieces above
//! - [`coordinator`] - Single coordination context (tokio actor)
//!
//! ### Boundaries
//!
//! - [`services`] - Traits for the external terminal and command services
//! - [`events`] - Lifecycle events in, notifications out
//! - [`models`] - Sessions, command blocks, shell kinds
//!
//! ### Support
//!
//! - [`config`] - TOML/JSON configuration loading and validation
//! - [`danger`] - Dangerous-command classification
//! - [`audit`] - Audit records for danger-gate decisions
//! - [`logging`] - `tracing` subscriber setup
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mosaicmux::{Coordinator, CommandExecutionService, TerminalService};
//!
//! # async fn run(
//! #     terminal: Arc<dyn TerminalService>,
//! #     commands: Arc<dyn CommandExecutionService>,
//! # ) -> mosaicmux::Result<()> {
//! let config = mosaicmux::init()?;
//! let handle = Coordinator::spawn(&config, terminal, commands)?;
//!
//! // Showing the panel with no sessions creates one
//! handle.show_panel().await?;
//!
//! let block = handle.create_block("cargo test", "bash").await?;
//! let outcome = handle.execute(block).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Coordination task:** owns all state and applies work in FIFO order
//! - **Service tasks:** one per outstanding execute/copy/send call, reporting
//!   back through the coordination queue
//! - **Producers:** terminal and command services push events through a
//!   thread-safe [`LifecycleSink`]
//!
//! Consumers read state through snapshots and notifications; all mutation
//! goes through [`CoordinatorHandle`].

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

pub mod audit;
pub mod config;
pub mod danger;
pub mod error;
pub mod logging;

// Core modules
pub mod coordinator;
pub mod gate;
pub mod multiplexer;
pub mod panel;
pub mod session;

// Boundary modules
pub mod events;
pub mod models;
pub mod services;

// Re-exports for core functionality
pub use config::loader::ConfigLoader;
pub use config::Config;
pub use coordinator::{ActionOutcome, Coordinator, CoordinatorHandle, LifecycleSink};
pub use error::{Error, Result};
pub use events::{LifecycleEvent, Notification, NotificationSubscription};
pub use multiplexer::{MultiplexerSnapshot, SessionMultiplexer};
pub use services::{CommandExecutionService, TerminalService};

// Convenience re-exports for common types
pub use danger::DangerClassifier;
pub use gate::{CommandGate, DangerState, GateAction};
pub use models::{
    CommandBlock, CommandId, CommandStatus, ExecutionResult, Session, SessionId, SessionOptions,
    SessionState, ShellKind,
};

// Version information
/// The current version of MosaicMux from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The crate description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize logging and load configuration from the default locations
///
/// Falls back to the default configuration when no file is found or the
/// file found cannot be loaded.
///
/// # Errors
///
/// Returns an error if the logging filter cannot be built from the
/// configured level.
pub fn init() -> Result<Config> {
    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet; report after init
            let config = Config::default();
            logging::init_logging(&config.logging)?;
            warn!("Failed to load configuration: {}. Using defaults", e);
            return Ok(config);
        }
    };
    logging::init_logging(&config.logging)?;
    info!("🚀 Initialized {} v{}", NAME, VERSION);
    Ok(config)
}

/// Initialize logging with configuration from an explicit file
///
/// # Errors
///
/// Unlike [`init`], a missing or invalid file is an error.
pub fn init_with_config(config_path: &std::path::Path) -> Result<Config> {
    let config = ConfigLoader::load_from_path(config_path)?;
    logging::init_logging(&config.logging)?;
    info!(
        "🚀 Initialized {} v{} with config: {}",
        NAME,
        VERSION,
        config_path.display()
    );
    Ok(config)
}

/// Get default configuration
///
/// # Examples
///
/// ```
/// use mosaicmux::default_config;
///
/// let config = default_config();
/// assert_eq!(config.coordinator.notification_capacity, 256);
/// ```
pub fn default_config() -> Config {
    Config::default()
}
