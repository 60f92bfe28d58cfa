//! External Service Abstractions
//!
//! The multiplexer never spawns processes or touches the clipboard itself.
//! Those jobs belong to the services behind these traits, which lets tests
//! run the whole coordination layer against in-memory mocks.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CommandBlock, ExecutionResult, Session, SessionId, SessionOptions};

/// Service that owns the shell processes behind sessions
///
/// Lifecycle changes are reported back asynchronously through a
/// [`LifecycleSink`](crate::coordinator::LifecycleSink), possibly from
/// other threads.
#[async_trait]
pub trait TerminalService: Send + Sync {
    /// Spawn a new session
    ///
    /// # Errors
    /// Returns an error if the shell could not be started
    async fn create_session(&self, options: SessionOptions) -> Result<Session>;

    /// Ask the session to close; completion is reported as a closed event
    async fn close_session(&self, id: SessionId) -> Result<()>;

    /// Tell the service which session receives focus
    async fn set_active_session(&self, id: SessionId) -> Result<()>;

    /// Write raw input to a session
    async fn execute_command(&self, id: SessionId, text: &str) -> Result<()>;
}

/// Service that runs command blocks
#[async_trait]
pub trait CommandExecutionService: Send + Sync {
    /// Run `block` in `session` and wait for its terminal outcome
    ///
    /// # Arguments
    /// * `block` - The command to run
    /// * `session` - Session the command was dispatched to
    /// * `capture_output` - Whether output should be captured in the result
    async fn execute(
        &self,
        block: &CommandBlock,
        session: SessionId,
        capture_output: bool,
    ) -> Result<ExecutionResult>;

    /// Put the command text on the clipboard
    async fn copy_to_clipboard(&self, block: &CommandBlock) -> Result<()>;

    /// Type the command text into `session` without running it
    async fn send_to_terminal(&self, block: &CommandBlock, session: SessionId) -> Result<()>;
}
