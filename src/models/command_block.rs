//! Command Block Model
//!
//! A command block is a unit of shell-command text produced upstream (for
//! example by an assistant suggesting a command) together with its safety
//! metadata and execution status. The text and safety metadata are fixed at
//! construction; the status is only changed through the execution gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::danger::DangerClassifier;

/// Opaque, unique command block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Mint a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an identifier minted elsewhere
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a command block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CommandStatus {
    /// No action taken yet
    #[default]
    Pending,
    /// Copied to the clipboard
    Copied,
    /// Typed into the active terminal without being run
    SentToTerminal,
    /// Running, awaiting the execution service
    Executing,
    /// Ran to completion
    Executed,
    /// Failed to run or reported failure
    Failed,
    /// Cancelled by its caller
    Cancelled,
}

impl CommandStatus {
    /// Terminal statuses disable re-execution
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandStatus::Executed | CommandStatus::Failed | CommandStatus::Cancelled
        )
    }

    /// Whether an execution is currently outstanding
    pub fn is_executing(&self) -> bool {
        matches!(self, CommandStatus::Executing)
    }

    /// Executable iff not currently executing and not in a terminal status
    pub fn can_execute(&self) -> bool {
        !self.is_executing() && !self.is_terminal()
    }

    /// Short label for status displays
    pub fn label(&self) -> &'static str {
        match self {
            CommandStatus::Pending => "pending",
            CommandStatus::Copied => "copied",
            CommandStatus::SentToTerminal => "sent",
            CommandStatus::Executing => "executing",
            CommandStatus::Executed => "executed",
            CommandStatus::Failed => "failed",
            CommandStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of a finished execution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Status the attempt ended in
    pub status: CommandStatus,
    /// Captured output, when capture was requested and available
    pub output: Option<String>,
    /// Human-readable failure message
    pub error: Option<String>,
    /// Exit code reported by the shell, if known
    pub exit_code: Option<i32>,
    /// Wall time the attempt took, if measured
    pub duration: Option<Duration>,
}

impl ExecutionResult {
    /// A successful run
    pub fn executed(output: Option<String>) -> Self {
        Self {
            status: CommandStatus::Executed,
            output,
            error: None,
            exit_code: Some(0),
            duration: None,
        }
    }

    /// A failed run with a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failed,
            output: None,
            error: Some(message.into()),
            exit_code: None,
            duration: None,
        }
    }

    /// A cancelled run
    pub fn cancelled() -> Self {
        Self {
            status: CommandStatus::Cancelled,
            output: None,
            error: None,
            exit_code: Some(130),
            duration: None,
        }
    }

    /// Attach an exit code
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attach the measured duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Coerce a service-reported outcome into a terminal status
    ///
    /// Services may only report `Executed`, `Failed` or `Cancelled`;
    /// anything else is not a clean terminal outcome and becomes `Failed`.
    pub(crate) fn normalized(mut self) -> Self {
        if !self.status.is_terminal() {
            let reported = self.status;
            self.status = CommandStatus::Failed;
            self.error.get_or_insert_with(|| {
                format!("Execution service reported non-terminal status '{}'", reported)
            });
        } else if self.status == CommandStatus::Executed
            && self.exit_code.is_some_and(|code| code != 0)
        {
            let code = self.exit_code.unwrap_or_default();
            self.status = CommandStatus::Failed;
            self.error
                .get_or_insert_with(|| format!("Command exited with code {}", code));
        }
        self
    }
}

/// A unit of shell-command text with safety metadata and status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandBlock {
    id: CommandId,
    text: String,
    language: String,
    dangerous: bool,
    warning: Option<String>,
    confidence: f32,
    status: CommandStatus,
    last_result: Option<ExecutionResult>,
    created_at: DateTime<Utc>,
}

impl CommandBlock {
    /// Create a new, non-dangerous command block
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: CommandId::new(),
            text: text.into(),
            language: language.into(),
            dangerous: false,
            warning: None,
            confidence: 1.0,
            status: CommandStatus::Pending,
            last_result: None,
            created_at: Utc::now(),
        }
    }

    /// Create a block and flag it using the given classifier
    pub fn classified(
        text: impl Into<String>,
        language: impl Into<String>,
        classifier: &DangerClassifier,
    ) -> Self {
        let block = Self::new(text, language);
        match classifier.classify(&block.text) {
            Some(warning) => block.with_danger(warning),
            None => block,
        }
    }

    /// Flag the block as dangerous with a warning text
    pub fn with_danger(mut self, warning: impl Into<String>) -> Self {
        self.dangerous = true;
        self.warning = Some(warning.into());
        self
    }

    /// Set the producer's confidence score, clamped to `0.0..=1.0`
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// Block identifier
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Command text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source language tag (e.g. `bash`, `powershell`)
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Whether the command was flagged dangerous
    pub fn is_dangerous(&self) -> bool {
        self.dangerous
    }

    /// Warning text shown before a dangerous command may run
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Producer's confidence score
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Current status
    pub fn status(&self) -> CommandStatus {
        self.status
    }

    /// Result of the most recent finished attempt
    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }

    /// When the block was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn set_status(&mut self, status: CommandStatus) {
        self.status = status;
    }

    pub(crate) fn record_result(&mut self, result: ExecutionResult) {
        self.status = result.status;
        self.last_result = Some(result);
    }
}
