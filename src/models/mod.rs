//! Core data models for MosaicMux
//!
//! This module contains the domain records the orchestrator tracks:
//! terminal sessions, shell kinds and command blocks.

pub mod command_block;
pub mod session;
pub mod shell_type;

// Re-exports for convenience
pub use command_block::{CommandBlock, CommandId, CommandStatus, ExecutionResult};
pub use session::{Session, SessionId, SessionOptions, SessionState};
pub use shell_type::ShellKind;
