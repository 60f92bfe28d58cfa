//! Command Execution Gate
//!
//! Per-block state machine deciding whether an action may run:
//!
//! ```text
//! Pending ──copy──────────▶ Copied
//!    │    ──send──────────▶ SentToTerminal
//!    └────execute─────────▶ Executing ──▶ Executed | Failed | Cancelled
//! ```
//!
//! A dangerous block needs a confirmation before it may be sent or
//! executed. Requesting the action without one only raises the warning;
//! confirming never runs anything by itself, the caller has to invoke the
//! action again.

use serde::{Deserialize, Serialize};

use crate::config::ConfirmationPolicy;
use crate::models::{CommandBlock, CommandStatus, ExecutionResult};

/// Actions a caller can request on a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateAction {
    /// Copy the text to the clipboard (never danger-gated)
    Copy,
    /// Type the text into the active session without running it
    SendToTerminal,
    /// Run the command in the active session
    Execute,
}

impl GateAction {
    /// Whether this action requires confirmation on dangerous blocks
    pub fn is_gated(&self) -> bool {
        !matches!(self, GateAction::Copy)
    }
}

/// Why an action was refused outright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    /// An execution is already outstanding
    AlreadyExecuting,
    /// The block reached a terminal status and cannot run again
    Finished(CommandStatus),
}

/// Outcome of asking the gate for permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    /// The action may be performed now
    Proceed,
    /// The warning was raised; nothing was performed
    WarningRequested,
    /// The action is not allowed in the current status
    Blocked(BlockReason),
}

/// Danger confirmation flags for one block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerState {
    /// The warning is currently shown
    pub warning_visible: bool,
    /// The user confirmed the command
    pub confirmed: bool,
}

/// Gate wrapping one command block
#[derive(Debug, Clone)]
pub struct CommandGate {
    block: CommandBlock,
    danger: DangerState,
    policy: ConfirmationPolicy,
}

impl CommandGate {
    /// Wrap a block
    pub fn new(block: CommandBlock, policy: ConfirmationPolicy) -> Self {
        Self {
            block,
            danger: DangerState::default(),
            policy,
        }
    }

    /// The gated block
    pub fn block(&self) -> &CommandBlock {
        &self.block
    }

    /// Current status
    pub fn status(&self) -> CommandStatus {
        self.block.status()
    }

    /// Current confirmation flags
    pub fn danger(&self) -> DangerState {
        self.danger
    }

    /// Whether an execute request could start an execution
    pub fn can_execute(&self) -> bool {
        self.status().can_execute()
    }

    /// Ask permission for an action
    ///
    /// On `Proceed` for a gated action on a dangerous block the
    /// confirmation is consumed under the single-shot policy.
    pub fn request(&mut self, action: GateAction) -> GateDecision {
        if let Some(reason) = self.blocked_reason(action) {
            return GateDecision::Blocked(reason);
        }
        if !action.is_gated() || !self.block.is_dangerous() {
            return GateDecision::Proceed;
        }
        if !self.danger.confirmed {
            self.danger.warning_visible = true;
            return GateDecision::WarningRequested;
        }
        if self.policy == ConfirmationPolicy::SingleShot {
            self.danger.confirmed = false;
        }
        GateDecision::Proceed
    }

    /// Why `action` would be refused regardless of confirmation
    pub fn blocked_reason(&self, action: GateAction) -> Option<BlockReason> {
        let status = self.status();
        if status.is_executing() {
            Some(BlockReason::AlreadyExecuting)
        } else if action == GateAction::Execute && status.is_terminal() {
            Some(BlockReason::Finished(status))
        } else {
            None
        }
    }

    /// Confirm the warning; performs no action
    pub fn confirm(&mut self) {
        self.danger.warning_visible = false;
        self.danger.confirmed = true;
    }

    /// Dismiss the warning without confirming
    pub fn cancel_warning(&mut self) {
        self.danger.warning_visible = false;
        self.danger.confirmed = false;
    }

    /// Drop a previously granted confirmation
    pub fn reset_confirmation(&mut self) {
        self.danger.confirmed = false;
    }

    /// Enter `Executing` after an approved execute request
    pub(crate) fn begin_execution(&mut self) -> CommandStatus {
        self.transition(CommandStatus::Executing)
    }

    /// Record a successful copy
    ///
    /// Copy and send only move a block between the executable display
    /// states; a running or finished block keeps its status.
    pub(crate) fn mark_copied(&mut self) -> Option<CommandStatus> {
        self.side_transition(CommandStatus::Copied)
    }

    /// Record a successful send-to-terminal
    pub(crate) fn mark_sent(&mut self) -> Option<CommandStatus> {
        self.side_transition(CommandStatus::SentToTerminal)
    }

    /// Record the outcome of an execution
    ///
    /// Ignored (returns `None`) unless the block is still executing, e.g.
    /// when the execution was cancelled before the service answered.
    pub(crate) fn complete(&mut self, result: ExecutionResult) -> Option<CommandStatus> {
        if !self.status().is_executing() {
            return None;
        }
        let old = self.status();
        self.block.record_result(result.normalized());
        Some(old)
    }

    /// Record a failed copy or send
    pub(crate) fn fail(&mut self, message: impl Into<String>) -> Option<CommandStatus> {
        let old = self.status();
        if !old.can_execute() {
            return None;
        }
        self.block.record_result(ExecutionResult::failed(message));
        Some(old)
    }

    /// Cancel an outstanding execution
    pub(crate) fn cancel_execution(&mut self) -> Option<CommandStatus> {
        if !self.status().is_executing() {
            return None;
        }
        let old = self.status();
        self.block.record_result(ExecutionResult::cancelled());
        Some(old)
    }

    /// Apply a status reported by the execution service
    pub(crate) fn apply_external(&mut self, status: CommandStatus) -> CommandStatus {
        self.transition(status)
    }

    fn side_transition(&mut self, status: CommandStatus) -> Option<CommandStatus> {
        if !self.can_execute() {
            return None;
        }
        Some(self.transition(status))
    }

    fn transition(&mut self, status: CommandStatus) -> CommandStatus {
        let old = self.status();
        self.block.set_status(status);
        old
    }
}
