//! Session Multiplexer Core
//!
//! Owns the session registry, the active selector, the command gates and the
//! panel, and is the only place their state is mutated. Every operation runs
//! to completion without suspending and publishes its notifications before
//! returning, so an observer never sees a notification that disagrees with
//! the state it describes.
//!
//! The multiplexer is not thread-safe on purpose; the
//! [`Coordinator`](crate::coordinator::Coordinator) serialises access to it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::audit::{AuditEvent, Auditor};
use crate::config::loader::ConfigLoader;
use crate::config::{Config, ConfirmationPolicy, PanelConfig};
use crate::danger::DangerClassifier;
use crate::error::{Error, Result};
use crate::events::{CommandStatusUpdate, LifecycleEvent, Notification, NotificationBus};
use crate::gate::{BlockReason, CommandGate, DangerState, GateAction, GateDecision};
use crate::models::{
    CommandBlock, CommandId, CommandStatus, ExecutionResult, Session, SessionId, SessionOptions,
    SessionState,
};
use crate::panel::PanelState;
use crate::session::{ActiveChange, ActiveSelector, SessionRegistry};

/// Work the caller must hand to a service after an approved request
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Approved action
    pub action: GateAction,
    /// Snapshot of the block at approval time
    pub block: CommandBlock,
    /// Session the action is bound to (`None` for copy)
    pub session: Option<SessionId>,
}

/// Result of requesting an action on a command block
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Approved; perform the dispatch
    Proceed(Dispatch),
    /// Dangerous and unconfirmed; the warning is now visible
    WarningRequested,
    /// Refused in the current status
    Blocked(BlockReason),
}

/// Read-only view of one command block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandView {
    /// The block
    pub block: CommandBlock,
    /// Confirmation flags
    pub danger: DangerState,
    /// Whether an execute request could start an execution
    pub executable: bool,
}

/// Read-only snapshot for external consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplexerSnapshot {
    /// Sessions in tab order
    pub sessions: Vec<Session>,
    /// Active session
    pub active: Option<SessionId>,
    /// Panel flags
    pub panel: PanelState,
    /// Command blocks in registration order
    pub commands: Vec<CommandView>,
}

impl MultiplexerSnapshot {
    /// Whether a session is active
    pub fn has_active_session(&self) -> bool {
        self.active.is_some()
    }

    /// The active session record
    pub fn active_session(&self) -> Option<&Session> {
        let active = self.active?;
        self.sessions.iter().find(|session| session.id == active)
    }
}

impl Default for MultiplexerSnapshot {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            active: None,
            panel: PanelState::default(),
            commands: Vec::new(),
        }
    }
}

/// Synchronous multiplexer state
#[derive(Debug)]
pub struct SessionMultiplexer {
    registry: SessionRegistry,
    selector: ActiveSelector,
    gates: HashMap<CommandId, CommandGate>,
    /// Registration order of command blocks
    command_order: Vec<CommandId>,
    panel: PanelState,
    panel_config: PanelConfig,
    policy: ConfirmationPolicy,
    classifier: DangerClassifier,
    auditor: Auditor,
    bus: NotificationBus,
}

impl SessionMultiplexer {
    /// Create a multiplexer from configuration
    ///
    /// # Errors
    /// Returns an error if the configuration does not validate
    pub fn new(config: &Config) -> Result<Self> {
        ConfigLoader::validate(config)?;
        Ok(Self {
            registry: SessionRegistry::new(),
            selector: ActiveSelector::new(),
            gates: HashMap::new(),
            command_order: Vec::new(),
            panel: PanelState::new(&config.panel),
            panel_config: config.panel.clone(),
            policy: config.gate.confirmation,
            classifier: DangerClassifier::from_config(&config.gate)?,
            auditor: Auditor::new(config.logging.audit),
            bus: NotificationBus::new(config.coordinator.notification_capacity),
        })
    }

    /// Notification bus this multiplexer publishes on
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    // === Lifecycle events ===

    /// Apply one lifecycle event
    ///
    /// Never fails: duplicate and late events are logged and dropped.
    /// Returns the active-session change the event caused, if any.
    pub fn apply_event(&mut self, event: LifecycleEvent) -> Option<ActiveChange> {
        trace!("Applying {} event for session {}", event.kind(), event.session_id());
        match event {
            LifecycleEvent::SessionCreated(session) => self.on_created(session),
            LifecycleEvent::SessionClosed(session) => self.on_closed(session.id),
            LifecycleEvent::SessionStateChanged {
                id,
                old,
                new,
                exit_code,
            } => {
                self.on_state_changed(id, old, new, exit_code);
                None
            }
            LifecycleEvent::TitleChanged { id, title } => {
                self.on_title_changed(id, title);
                None
            }
        }
    }

    fn on_created(&mut self, mut session: Session) -> Option<ActiveChange> {
        let id = session.id;
        session.focused = false;
        let index = match self.registry.insert(session) {
            Ok(index) => index,
            Err(e) => {
                error!("Dropping session created event: {}", e);
                return None;
            }
        };
        info!("Session {} added at index {}", id, index);
        self.bus.publish(Notification::SessionAdded { id, index });

        match self.selector.activate(&mut self.registry, id) {
            Ok(change) => {
                self.publish_active(change);
                change
            }
            Err(e) => {
                error!("Failed to activate new session {}: {}", id, e);
                None
            }
        }
    }

    fn on_closed(&mut self, id: SessionId) -> Option<ActiveChange> {
        let (_, index) = match self.registry.remove(id) {
            Ok(removed) => removed,
            Err(e) => {
                debug!("Dropping late session closed event: {}", e);
                return None;
            }
        };
        info!("Session {} removed from index {}", id, index);
        self.bus.publish(Notification::SessionRemoved { id, index });

        let change = self.selector.on_removed(&mut self.registry, id, index);
        self.publish_active(change);
        change
    }

    fn on_state_changed(
        &mut self,
        id: SessionId,
        old: SessionState,
        new: SessionState,
        exit_code: Option<i32>,
    ) {
        let Some(session) = self.registry.get_mut(id) else {
            debug!("Dropping state change for unknown session {}", id);
            return;
        };
        if session.state != old || !session.state.can_transition_to(new) {
            debug!(
                "Session {} reported {:?} -> {:?} while recorded as {:?}",
                id, old, new, session.state
            );
        }
        session.apply_state(new, exit_code);
        self.bus.publish(Notification::SessionUpdated { id });
    }

    fn on_title_changed(&mut self, id: SessionId, title: String) {
        let Some(session) = self.registry.get_mut(id) else {
            debug!("Dropping title change for unknown session {}", id);
            return;
        };
        session.title = Some(title);
        self.bus.publish(Notification::SessionUpdated { id });
    }

    // === Sessions ===

    /// Make `id` the active session
    pub fn activate(&mut self, id: SessionId) -> Result<Option<ActiveChange>> {
        let change = self.selector.activate(&mut self.registry, id)?;
        self.publish_active(change);
        Ok(change)
    }

    /// Activate the session at a tab index
    pub fn activate_index(&mut self, index: usize) -> Option<ActiveChange> {
        let change = self.selector.activate_index(&mut self.registry, index);
        self.publish_active(change);
        change
    }

    /// Activate the next tab, wrapping around
    pub fn next(&mut self) -> Option<ActiveChange> {
        let change = self.selector.next(&mut self.registry);
        self.publish_active(change);
        change
    }

    /// Activate the previous tab, wrapping around
    pub fn previous(&mut self) -> Option<ActiveChange> {
        let change = self.selector.previous(&mut self.registry);
        self.publish_active(change);
        change
    }

    /// Mark a session as closing ahead of the service's closed event
    ///
    /// Returns the state the session was in before.
    pub fn mark_closing(&mut self, id: SessionId) -> Result<SessionState> {
        let session = self
            .registry
            .get_mut(id)
            .ok_or(Error::SessionNotFound { id })?;
        let previous = session.state;
        if previous != SessionState::Closing {
            session.apply_state(SessionState::Closing, None);
            self.bus.publish(Notification::SessionUpdated { id });
        }
        Ok(previous)
    }

    /// Undo [`mark_closing`](Self::mark_closing) after the service refused to close
    ///
    /// Only a session that is still `Closing` is restored; returns whether
    /// the state changed.
    pub fn close_failed(&mut self, id: SessionId, previous: SessionState) -> bool {
        let Some(session) = self.registry.get_mut(id) else {
            return false;
        };
        if session.state != SessionState::Closing || previous == SessionState::Closing {
            return false;
        }
        session.apply_state(previous, session.exit_code);
        self.bus.publish(Notification::SessionUpdated { id });
        true
    }

    /// The session registry
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Sessions in tab order
    pub fn sessions(&self) -> Vec<Session> {
        self.registry.iter().cloned().collect()
    }

    /// Active session id
    pub fn active_id(&self) -> Option<SessionId> {
        self.selector.active()
    }

    /// Active session record
    pub fn active_session(&self) -> Option<&Session> {
        self.selector.active().and_then(|id| self.registry.get(id))
    }

    /// Options for sessions the multiplexer creates on its own
    pub fn default_session_options(&self) -> SessionOptions {
        SessionOptions {
            shell: self.panel_config.default_shell.clone(),
            working_directory: self.panel_config.default_working_directory.clone(),
            title: None,
        }
    }

    // === Command blocks ===

    /// Register a block produced upstream
    ///
    /// Registering an id twice keeps the block already registered.
    pub fn register_block(&mut self, block: CommandBlock) -> CommandId {
        let id = block.id();
        if self.gates.contains_key(&id) {
            warn!("Command block {} is already registered", id);
            return id;
        }
        debug!("Registered command block {} (dangerous: {})", id, block.is_dangerous());
        self.gates.insert(id, CommandGate::new(block, self.policy));
        self.command_order.push(id);
        id
    }

    /// Build a block from text, flag it with the danger classifier and register it
    pub fn create_block(&mut self, text: &str, language: &str) -> CommandId {
        let block = CommandBlock::classified(text, language, &self.classifier);
        self.register_block(block)
    }

    /// Forget a block
    pub fn remove_block(&mut self, id: CommandId) -> Result<CommandBlock> {
        let gate = self.gates.remove(&id).ok_or(Error::CommandNotFound { id })?;
        self.command_order.retain(|candidate| *candidate != id);
        Ok(gate.block().clone())
    }

    /// Look up a block
    pub fn block(&self, id: CommandId) -> Option<&CommandBlock> {
        self.gates.get(&id).map(CommandGate::block)
    }

    /// Look up a block's gate
    pub fn gate(&self, id: CommandId) -> Option<&CommandGate> {
        self.gates.get(&id)
    }

    /// Blocks in registration order
    pub fn blocks(&self) -> impl Iterator<Item = &CommandBlock> + '_ {
        self.command_order
            .iter()
            .filter_map(|id| self.gates.get(id).map(CommandGate::block))
    }

    /// Whether an execute request could start an execution of `id`
    pub fn is_executable(&self, id: CommandId) -> Result<bool> {
        self.gates
            .get(&id)
            .map(CommandGate::can_execute)
            .ok_or(Error::CommandNotFound { id })
    }

    /// Ask the gate for permission to perform `action` on `id`
    ///
    /// An approved execute moves the block to `Executing` before returning.
    ///
    /// # Errors
    /// `CommandNotFound` for unknown blocks; `NoActiveSession` when a send
    /// or execute is requested with no session to target.
    pub fn request(&mut self, id: CommandId, action: GateAction) -> Result<GateOutcome> {
        let active = self.selector.active();
        let gate = self.gates.get_mut(&id).ok_or(Error::CommandNotFound { id })?;

        if let Some(reason) = gate.blocked_reason(action) {
            debug!("Command {} refused {:?}: {:?}", id, action, reason);
            return Ok(GateOutcome::Blocked(reason));
        }
        let session = if action == GateAction::Copy {
            None
        } else {
            Some(active.ok_or(Error::NoActiveSession)?)
        };

        match gate.request(action) {
            GateDecision::Proceed => {
                let dangerous = gate.block().is_dangerous();
                let status_change = (action == GateAction::Execute)
                    .then(|| (gate.begin_execution(), CommandStatus::Executing));
                let block = gate.block().clone();

                if dangerous && action.is_gated() {
                    self.auditor
                        .record(AuditEvent::DangerousDispatch, id, block.text());
                }
                if let Some((old, new)) = status_change {
                    self.publish_status(id, old, new);
                }
                Ok(GateOutcome::Proceed(Dispatch {
                    action,
                    block,
                    session,
                }))
            }
            GateDecision::WarningRequested => {
                let block = gate.block();
                let warning = block
                    .warning()
                    .unwrap_or("This command was flagged as dangerous")
                    .to_string();
                self.auditor.record(AuditEvent::WarningShown, id, block.text());
                self.bus.publish(Notification::WarningRequested {
                    command_id: id,
                    warning,
                });
                Ok(GateOutcome::WarningRequested)
            }
            GateDecision::Blocked(reason) => Ok(GateOutcome::Blocked(reason)),
        }
    }

    /// Confirm the danger warning of `id`; performs no action
    pub fn confirm(&mut self, id: CommandId) -> Result<()> {
        let gate = self.gates.get_mut(&id).ok_or(Error::CommandNotFound { id })?;
        gate.confirm();
        if gate.block().is_dangerous() {
            self.auditor
                .record(AuditEvent::ConfirmationGranted, id, gate.block().text());
        }
        Ok(())
    }

    /// Dismiss the danger warning of `id`
    pub fn cancel_warning(&mut self, id: CommandId) -> Result<()> {
        let gate = self.gates.get_mut(&id).ok_or(Error::CommandNotFound { id })?;
        gate.cancel_warning();
        if gate.block().is_dangerous() {
            self.auditor
                .record(AuditEvent::ConfirmationCancelled, id, gate.block().text());
        }
        Ok(())
    }

    /// Drop a confirmation granted earlier
    pub fn reset_confirmation(&mut self, id: CommandId) -> Result<()> {
        self.gates
            .get_mut(&id)
            .ok_or(Error::CommandNotFound { id })?
            .reset_confirmation();
        Ok(())
    }

    /// Record the outcome of an execution
    ///
    /// Returns `false` when the outcome was ignored because the block is no
    /// longer executing or no longer registered.
    pub fn finish_execution(&mut self, id: CommandId, result: ExecutionResult) -> bool {
        let Some(gate) = self.gates.get_mut(&id) else {
            debug!("Dropping execution result for unknown command {}", id);
            return false;
        };
        let Some(old) = gate.complete(result) else {
            debug!("Ignoring late execution result for command {}", id);
            return false;
        };
        let new = gate.status();
        if new == CommandStatus::Failed {
            let reason = gate
                .block()
                .last_result()
                .and_then(|r| r.error.as_deref())
                .unwrap_or("unknown error");
            warn!("Command {} failed: {}", id, reason);
            self.auditor
                .record(AuditEvent::ExecutionFailed, id, gate.block().text());
        }
        self.publish_status(id, old, new);
        true
    }

    /// Cancel an outstanding execution of `id`
    ///
    /// Returns `Ok(false)` when the block was not executing.
    pub fn cancel_execution(&mut self, id: CommandId) -> Result<bool> {
        let gate = self.gates.get_mut(&id).ok_or(Error::CommandNotFound { id })?;
        match gate.cancel_execution() {
            Some(old) => {
                info!("Cancelled execution of command {}", id);
                self.publish_status(id, old, CommandStatus::Cancelled);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Record a successful copy
    pub fn mark_copied(&mut self, id: CommandId) -> bool {
        self.side_action(id, |gate| gate.mark_copied())
    }

    /// Record a successful send-to-terminal
    pub fn mark_sent(&mut self, id: CommandId) -> bool {
        self.side_action(id, |gate| gate.mark_sent())
    }

    /// Record a failed copy or send
    pub fn fail_action(&mut self, id: CommandId, message: &str) -> bool {
        warn!("Command {} action failed: {}", id, message);
        self.side_action(id, |gate| gate.fail(message))
    }

    fn side_action(
        &mut self,
        id: CommandId,
        apply: impl FnOnce(&mut CommandGate) -> Option<CommandStatus>,
    ) -> bool {
        let Some(gate) = self.gates.get_mut(&id) else {
            debug!("Dropping action result for unknown command {}", id);
            return false;
        };
        match apply(gate) {
            Some(old) => {
                let new = gate.status();
                self.publish_status(id, old, new);
                true
            }
            None => false,
        }
    }

    /// Apply a status reported by the command execution service
    pub fn apply_command_status(&mut self, update: CommandStatusUpdate) -> bool {
        let Some(gate) = self.gates.get_mut(&update.command_id) else {
            debug!("Dropping status change for unknown command {}", update.command_id);
            return false;
        };
        let old = gate.apply_external(update.new);
        if old != update.new {
            self.publish_status(update.command_id, old, update.new);
        }
        true
    }

    // === Panel ===

    /// Panel flags
    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    /// Whether the panel is visible with no session to show
    pub fn needs_session(&self) -> bool {
        self.panel.is_visible() && self.registry.is_empty()
    }

    /// Show the panel; returns whether a session must be created
    pub fn show_panel(&mut self) -> bool {
        let transition = self.panel.show();
        self.publish_panel(transition.changed);
        self.needs_session()
    }

    /// Hide the panel
    pub fn hide_panel(&mut self) {
        let transition = self.panel.hide();
        self.publish_panel(transition.changed);
    }

    /// Flip visibility; returns whether a session must be created
    pub fn toggle_panel(&mut self) -> bool {
        let transition = self.panel.toggle();
        self.publish_panel(transition.changed);
        transition.became_visible && self.needs_session()
    }

    /// Maximize, showing first if needed; returns whether a session must be created
    pub fn maximize_panel(&mut self) -> bool {
        let transition = self.panel.maximize();
        self.publish_panel(transition.changed);
        self.needs_session()
    }

    /// Leave maximized mode
    pub fn restore_panel(&mut self) {
        let transition = self.panel.restore();
        self.publish_panel(transition.changed);
    }

    /// Flip maximized mode; returns whether a session must be created
    pub fn toggle_maximize_panel(&mut self) -> bool {
        let transition = self.panel.toggle_maximize();
        self.publish_panel(transition.changed);
        self.panel.is_maximized() && self.needs_session()
    }

    /// Resize the panel within its configured bounds
    pub fn set_panel_size(&mut self, size: f32) {
        let transition = self.panel.set_size(size);
        self.publish_panel(transition.changed);
    }

    // === Snapshots ===

    /// Serializable snapshot of the current state
    pub fn snapshot(&self) -> MultiplexerSnapshot {
        MultiplexerSnapshot {
            sessions: self.sessions(),
            active: self.selector.active(),
            panel: self.panel,
            commands: self
                .command_order
                .iter()
                .filter_map(|id| self.gates.get(id))
                .map(|gate| CommandView {
                    block: gate.block().clone(),
                    danger: gate.danger(),
                    executable: gate.can_execute(),
                })
                .collect(),
        }
    }

    fn publish_active(&self, change: Option<ActiveChange>) {
        if let Some(change) = change {
            debug!("Active session: {:?} -> {:?}", change.previous, change.current);
            self.bus.publish(Notification::ActiveSessionChanged {
                previous: change.previous,
                current: change.current,
            });
        }
    }

    fn publish_status(&self, command_id: CommandId, old: CommandStatus, new: CommandStatus) {
        self.bus.publish(Notification::CommandStatusChanged {
            command_id,
            old,
            new,
        });
    }

    fn publish_panel(&self, changed: bool) {
        if changed {
            self.bus.publish(Notification::PanelChanged {
                visible: self.panel.is_visible(),
                maximized: self.panel.is_maximized(),
                size: self.panel.size(),
            });
        }
    }
}
