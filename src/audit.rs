//! Danger Gate Audit Logging
//!
//! Records every decision the execution gate makes about a command flagged
//! as dangerous.
//!
//! ## Audit Policy
//!
//! - **NEVER** log captured command output
//! - Command text is truncated and stripped of control characters
//! - INFO level for gate decisions, WARN when a dangerous command is dispatched

use crate::models::CommandId;

/// Longest command excerpt written to the audit log
const MAX_EXCERPT_CHARS: usize = 80;

/// Audit event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    /// Action on a dangerous command was held back behind a warning
    WarningShown,
    /// User confirmed a dangerous command
    ConfirmationGranted,
    /// User dismissed the warning
    ConfirmationCancelled,
    /// Dangerous command was dispatched to a session
    DangerousDispatch,
    /// Execution of a command failed
    ExecutionFailed,
}

impl AuditEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> &'static str {
        match self {
            AuditEvent::WarningShown => "Dangerous command held for confirmation",
            AuditEvent::ConfirmationGranted => "Dangerous command confirmed",
            AuditEvent::ConfirmationCancelled => "Dangerous command warning dismissed",
            AuditEvent::DangerousDispatch => "Dangerous command dispatched",
            AuditEvent::ExecutionFailed => "Command execution failed",
        }
    }

    /// Whether the event should be logged at warning level
    pub fn is_elevated(&self) -> bool {
        matches!(self, AuditEvent::DangerousDispatch)
    }
}

/// Audit logger; a disabled auditor records nothing
#[derive(Debug, Clone, Copy)]
pub struct Auditor {
    enabled: bool,
}

impl Auditor {
    /// Create an auditor
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether records are written
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log an audit record for a command
    pub fn record(&self, event: AuditEvent, command: CommandId, text: &str) {
        if !self.enabled {
            return;
        }
        let message = format!(
            "AUDIT: {} | command={} text=\"{}\"",
            event.description(),
            command,
            excerpt(text)
        );
        if event.is_elevated() {
            warn!("{}", message);
        } else {
            info!("{}", message);
        }
    }
}

impl Default for Auditor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Sanitize command text to prevent log injection
fn excerpt(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .filter(|c| *c != '"')
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.chars().count() > MAX_EXCERPT_CHARS {
        let truncated: String = cleaned.chars().take(MAX_EXCERPT_CHARS).collect();
        format!("{}…", truncated)
    } else {
        cleaned.to_string()
    }
}
