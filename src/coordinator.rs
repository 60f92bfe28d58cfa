//! Coordination Context
//!
//! One tokio task owns the [`SessionMultiplexer`] and applies lifecycle
//! events and caller operations strictly in the order they were queued.
//! Producers on any thread feed it through a [`LifecycleSink`]; callers use
//! the cheap-to-clone [`CoordinatorHandle`].
//!
//! Service calls that may take a while (execute, copy, send, close, raw
//! input) run in their own tasks and report back through the same queue, so
//! the context keeps applying events while a command is executing. Creating
//! a session is the exception: it is awaited in place so that showing an
//! empty panel creates exactly one session.

use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{
    CommandStatusUpdate, LifecycleEvent, NotificationBus, NotificationSubscription,
};
use crate::gate::{BlockReason, GateAction};
use crate::models::{
    CommandBlock, CommandId, CommandStatus, ExecutionResult, Session, SessionId, SessionOptions,
    SessionState,
};
use crate::multiplexer::{Dispatch, GateOutcome, MultiplexerSnapshot, SessionMultiplexer};
use crate::services::{CommandExecutionService, TerminalService};
use crate::session::ActiveChange;

const TERMINAL_SERVICE: &str = "terminal service";
const COMMAND_SERVICE: &str = "command execution service";

/// Final answer to a copy, send or execute request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action ran; carries the block's status afterwards
    ///
    /// A failed execution is reported here as `Failed`, not as an error.
    Completed(CommandStatus),
    /// The block is dangerous and unconfirmed; nothing ran
    WarningRequested,
    /// The action is not allowed in the block's current status
    Blocked(BlockReason),
}

impl ActionOutcome {
    /// Status the block ended in, when the action ran
    pub fn status(&self) -> Option<CommandStatus> {
        match self {
            ActionOutcome::Completed(status) => Some(*status),
            _ => None,
        }
    }
}

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug, Clone, Copy)]
enum PanelOp {
    Show,
    Hide,
    Toggle,
    Maximize,
    Restore,
    ToggleMaximize,
    Resize(f32),
}

enum Command {
    Lifecycle(LifecycleEvent),
    CommandStatus(CommandStatusUpdate),
    Activate {
        id: SessionId,
        reply: Reply<Result<Option<ActiveChange>>>,
    },
    ActivateIndex {
        index: usize,
        reply: Reply<Option<ActiveChange>>,
    },
    Next {
        reply: Reply<Option<ActiveChange>>,
    },
    Previous {
        reply: Reply<Option<ActiveChange>>,
    },
    CreateSession {
        options: SessionOptions,
        reply: Reply<Result<SessionId>>,
    },
    CloseSession {
        id: SessionId,
        reply: Reply<Result<()>>,
    },
    CloseFailed {
        id: SessionId,
        previous: SessionState,
        error: Error,
        reply: Reply<Result<()>>,
    },
    WriteToActive {
        text: String,
        reply: Reply<Result<()>>,
    },
    RegisterBlock {
        block: CommandBlock,
        reply: Reply<CommandId>,
    },
    CreateBlock {
        text: String,
        language: String,
        reply: Reply<CommandId>,
    },
    RemoveBlock {
        id: CommandId,
        reply: Reply<Result<CommandBlock>>,
    },
    IsExecutable {
        id: CommandId,
        reply: Reply<Result<bool>>,
    },
    Request {
        id: CommandId,
        action: GateAction,
        reply: Reply<Result<ActionOutcome>>,
    },
    Confirm {
        id: CommandId,
        reply: Reply<Result<()>>,
    },
    CancelWarning {
        id: CommandId,
        reply: Reply<Result<()>>,
    },
    ResetConfirmation {
        id: CommandId,
        reply: Reply<Result<()>>,
    },
    Cancel {
        id: CommandId,
        reply: Reply<Result<bool>>,
    },
    ExecutionFinished {
        id: CommandId,
        ticket: u64,
        result: ExecutionResult,
    },
    ActionFinished {
        id: CommandId,
        action: GateAction,
        result: Result<()>,
        reply: Reply<Result<ActionOutcome>>,
    },
    Panel {
        op: PanelOp,
        reply: Reply<Result<()>>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// An execution waiting on the command service
struct Inflight {
    ticket: u64,
    abort: AbortHandle,
    reply: Option<Reply<Result<ActionOutcome>>>,
}

/// The coordination context
pub struct Coordinator {
    mux: SessionMultiplexer,
    terminal: Arc<dyn TerminalService>,
    commands: Arc<dyn CommandExecutionService>,
    capture_output: bool,
    inbox: mpsc::UnboundedReceiver<Command>,
    /// Weak so the queue closes once every handle is gone
    self_tx: mpsc::WeakUnboundedSender<Command>,
    inflight: HashMap<CommandId, Inflight>,
    next_ticket: u64,
    /// Sessions registered from a create call whose created event is still due
    adopted: HashSet<SessionId>,
    focus_tx: mpsc::UnboundedSender<SessionId>,
    snapshot_tx: watch::Sender<MultiplexerSnapshot>,
}

impl Coordinator {
    /// Start the coordination context on the current tokio runtime
    ///
    /// # Errors
    /// Returns an error if the configuration does not validate
    pub fn spawn(
        config: &Config,
        terminal: Arc<dyn TerminalService>,
        commands: Arc<dyn CommandExecutionService>,
    ) -> Result<CoordinatorHandle> {
        let mux = SessionMultiplexer::new(config)?;
        let bus = mux.bus().clone();
        let (tx, inbox) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(mux.snapshot());
        let (focus_tx, focus_rx) = mpsc::unbounded_channel();

        tokio::spawn(forward_focus(Arc::clone(&terminal), focus_rx));

        let coordinator = Coordinator {
            mux,
            terminal,
            commands,
            capture_output: config.gate.capture_output,
            inbox,
            self_tx: tx.downgrade(),
            inflight: HashMap::new(),
            next_ticket: 0,
            adopted: HashSet::new(),
            focus_tx,
            snapshot_tx,
        };
        tokio::spawn(coordinator.run());
        info!("Coordinator started");

        Ok(CoordinatorHandle {
            tx,
            snapshot: snapshot_rx,
            bus,
        })
    }

    async fn run(mut self) {
        if self.mux.needs_session() {
            let options = self.mux.default_session_options();
            if let Err(e) = self.create_session(options).await {
                warn!("Failed to create initial session: {}", e);
            }
            self.publish_snapshot();
        }

        while let Some(command) = self.inbox.recv().await {
            if let Command::Shutdown { reply } = command {
                self.cancel_all();
                self.publish_snapshot();
                let _ = reply.send(());
                break;
            }
            self.handle(command).await;
        }
        self.cancel_all();
        info!("Coordinator stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Lifecycle(event) => self.apply_lifecycle(event),
            Command::CommandStatus(update) => {
                self.mux.apply_command_status(update);
                self.publish_snapshot();
            }
            Command::Activate { id, reply } => {
                let result = self.mux.activate(id);
                self.focus(result.as_ref().ok().copied().flatten());
                self.respond(reply, result);
            }
            Command::ActivateIndex { index, reply } => {
                let change = self.mux.activate_index(index);
                self.focus(change);
                self.respond(reply, change);
            }
            Command::Next { reply } => {
                let change = self.mux.next();
                self.focus(change);
                self.respond(reply, change);
            }
            Command::Previous { reply } => {
                let change = self.mux.previous();
                self.focus(change);
                self.respond(reply, change);
            }
            Command::CreateSession { options, reply } => {
                let result = self.create_session(options).await;
                self.respond(reply, result);
            }
            Command::CloseSession { id, reply } => self.close_session(id, reply),
            Command::CloseFailed {
                id,
                previous,
                error,
                reply,
            } => {
                if self.mux.close_failed(id, previous) {
                    debug!("Session {} restored to {:?}", id, previous);
                }
                self.respond(reply, Err(error));
            }
            Command::WriteToActive { text, reply } => self.write_to_active(text, reply),
            Command::RegisterBlock { block, reply } => {
                let id = self.mux.register_block(block);
                self.respond(reply, id);
            }
            Command::CreateBlock {
                text,
                language,
                reply,
            } => {
                let id = self.mux.create_block(&text, &language);
                self.respond(reply, id);
            }
            Command::RemoveBlock { id, reply } => {
                let _ = self.mux.cancel_execution(id);
                self.abort_inflight(id);
                let result = self.mux.remove_block(id);
                self.respond(reply, result);
            }
            Command::IsExecutable { id, reply } => {
                let result = self.mux.is_executable(id);
                let _ = reply.send(result);
            }
            Command::Request { id, action, reply } => self.request(id, action, reply),
            Command::Confirm { id, reply } => {
                let result = self.mux.confirm(id);
                self.respond(reply, result);
            }
            Command::CancelWarning { id, reply } => {
                let result = self.mux.cancel_warning(id);
                self.respond(reply, result);
            }
            Command::ResetConfirmation { id, reply } => {
                let result = self.mux.reset_confirmation(id);
                self.respond(reply, result);
            }
            Command::Cancel { id, reply } => {
                let result = self.mux.cancel_execution(id);
                self.abort_inflight(id);
                self.respond(reply, result);
            }
            Command::ExecutionFinished { id, ticket, result } => {
                self.finish_execution(id, ticket, result)
            }
            Command::ActionFinished {
                id,
                action,
                result,
                reply,
            } => {
                match result {
                    Ok(()) if action == GateAction::Copy => {
                        self.mux.mark_copied(id);
                    }
                    Ok(()) => {
                        self.mux.mark_sent(id);
                    }
                    Err(e) => {
                        self.mux.fail_action(id, &e.to_string());
                    }
                }
                let outcome = self.outcome_for(id);
                self.respond(reply, outcome);
            }
            Command::Panel { op, reply } => {
                let result = self.apply_panel(op).await;
                self.respond(reply, result);
            }
            // Handled by the run loop
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn apply_lifecycle(&mut self, event: LifecycleEvent) {
        match &event {
            LifecycleEvent::SessionCreated(session) if self.adopted.remove(&session.id) => {
                debug!("Session {} was already registered by its create call", session.id);
                return;
            }
            LifecycleEvent::SessionClosed(session) => {
                self.adopted.remove(&session.id);
            }
            _ => {}
        }
        let change = self.mux.apply_event(event);
        self.focus(change);
        self.publish_snapshot();
    }

    async fn create_session(&mut self, options: SessionOptions) -> Result<SessionId> {
        let session = guarded(TERMINAL_SERVICE, self.terminal.create_session(options)).await?;
        let id = session.id;
        if self.mux.registry().contains(id) {
            return Ok(id);
        }

        let change = self.mux.apply_event(LifecycleEvent::SessionCreated(session));
        if !self.mux.registry().contains(id) {
            return Err(Error::DuplicateSession { id });
        }
        self.adopted.insert(id);
        self.focus(change);
        Ok(id)
    }

    fn close_session(&mut self, id: SessionId, reply: Reply<Result<()>>) {
        let previous = match self.mux.mark_closing(id) {
            Ok(previous) => previous,
            Err(e) => {
                self.respond(reply, Err(e));
                return;
            }
        };
        self.publish_snapshot();

        let terminal = Arc::clone(&self.terminal);
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            match guarded(TERMINAL_SERVICE, terminal.close_session(id)).await {
                Ok(()) => {
                    let _ = reply.send(Ok(()));
                }
                Err(error) => {
                    warn!("Failed to close session {}: {}", id, error);
                    report(
                        &tx,
                        Command::CloseFailed {
                            id,
                            previous,
                            error,
                            reply,
                        },
                    );
                }
            }
        });
    }

    fn write_to_active(&mut self, text: String, reply: Reply<Result<()>>) {
        let Some(id) = self.mux.active_id() else {
            let _ = reply.send(Err(Error::NoActiveSession));
            return;
        };
        let terminal = Arc::clone(&self.terminal);
        tokio::spawn(async move {
            let result = guarded(TERMINAL_SERVICE, terminal.execute_command(id, &text)).await;
            let _ = reply.send(result);
        });
    }

    fn request(&mut self, id: CommandId, action: GateAction, reply: Reply<Result<ActionOutcome>>) {
        match self.mux.request(id, action) {
            Ok(GateOutcome::Proceed(dispatch)) => self.dispatch(dispatch, reply),
            Ok(GateOutcome::WarningRequested) => {
                self.respond(reply, Ok(ActionOutcome::WarningRequested))
            }
            Ok(GateOutcome::Blocked(reason)) => {
                self.respond(reply, Ok(ActionOutcome::Blocked(reason)))
            }
            Err(e) => self.respond(reply, Err(e)),
        }
    }

    fn dispatch(&mut self, dispatch: Dispatch, reply: Reply<Result<ActionOutcome>>) {
        let Dispatch {
            action,
            block,
            session,
        } = dispatch;
        let id = block.id();

        if self.self_tx.upgrade().is_none() {
            // Every handle is gone; nobody will read the outcome
            if action == GateAction::Execute {
                self.mux.finish_execution(
                    id,
                    ExecutionResult::failed("Coordinator is shutting down"),
                );
            }
            self.respond(reply, Err(Error::CoordinatorClosed));
            return;
        }
        let tx = self.self_tx.clone();
        let service = Arc::clone(&self.commands);

        match (action, session) {
            (GateAction::Execute, Some(session)) => {
                let ticket = self.next_ticket;
                self.next_ticket += 1;
                let capture = self.capture_output;
                info!("Executing command {} in session {}", id, session);

                let task = tokio::spawn(async move {
                    let started = Instant::now();
                    let result =
                        match guarded(COMMAND_SERVICE, service.execute(&block, session, capture))
                            .await
                        {
                            Ok(result) => result,
                            Err(e) => ExecutionResult::failed(e.to_string()),
                        };
                    let result = match result.duration {
                        Some(_) => result,
                        None => result.with_duration(started.elapsed()),
                    };
                    report(&tx, Command::ExecutionFinished { id, ticket, result });
                });

                let inflight = Inflight {
                    ticket,
                    abort: task.abort_handle(),
                    reply: Some(reply),
                };
                if let Some(previous) = self.inflight.insert(id, inflight) {
                    debug!("Execution of command {} superseded an earlier run", id);
                    previous.abort.abort();
                    if let Some(waiter) = previous.reply {
                        let _ = waiter.send(Ok(ActionOutcome::Completed(CommandStatus::Cancelled)));
                    }
                }
                self.publish_snapshot();
            }
            (GateAction::Copy, _) | (_, Some(_)) => {
                tokio::spawn(async move {
                    let result = match (action, session) {
                        (GateAction::SendToTerminal, Some(session)) => {
                            guarded(COMMAND_SERVICE, service.send_to_terminal(&block, session))
                                .await
                        }
                        _ => guarded(COMMAND_SERVICE, service.copy_to_clipboard(&block)).await,
                    };
                    report(
                        &tx,
                        Command::ActionFinished {
                            id,
                            action,
                            result,
                            reply,
                        },
                    );
                });
            }
            (_, None) => self.respond(reply, Err(Error::NoActiveSession)),
        }
    }

    fn finish_execution(&mut self, id: CommandId, ticket: u64, result: ExecutionResult) {
        if self.inflight.get(&id).map(|inflight| inflight.ticket) != Some(ticket) {
            debug!("Ignoring stale execution result for command {}", id);
            return;
        }
        let waiter = self.inflight.remove(&id).and_then(|inflight| inflight.reply);
        self.mux.finish_execution(id, result);

        let outcome = self.outcome_for(id);
        match waiter {
            Some(waiter) => self.respond(waiter, outcome),
            None => self.publish_snapshot(),
        }
    }

    /// Abort the task behind an execution and answer its waiter
    fn abort_inflight(&mut self, id: CommandId) {
        if let Some(inflight) = self.inflight.remove(&id) {
            inflight.abort.abort();
            if let Some(waiter) = inflight.reply {
                let status = self
                    .mux
                    .block(id)
                    .map(CommandBlock::status)
                    .unwrap_or(CommandStatus::Cancelled);
                let _ = waiter.send(Ok(ActionOutcome::Completed(status)));
            }
        }
    }

    fn cancel_all(&mut self) {
        let ids: Vec<CommandId> = self.inflight.keys().copied().collect();
        for id in ids {
            let _ = self.mux.cancel_execution(id);
            self.abort_inflight(id);
        }
    }

    async fn apply_panel(&mut self, op: PanelOp) -> Result<()> {
        let needs_session = match op {
            PanelOp::Show => self.mux.show_panel(),
            PanelOp::Toggle => self.mux.toggle_panel(),
            PanelOp::Maximize => self.mux.maximize_panel(),
            PanelOp::ToggleMaximize => self.mux.toggle_maximize_panel(),
            PanelOp::Hide => {
                self.mux.hide_panel();
                false
            }
            PanelOp::Restore => {
                self.mux.restore_panel();
                false
            }
            PanelOp::Resize(size) => {
                self.mux.set_panel_size(size);
                false
            }
        };
        if needs_session {
            let options = self.mux.default_session_options();
            self.create_session(options).await?;
        }
        Ok(())
    }

    fn outcome_for(&self, id: CommandId) -> Result<ActionOutcome> {
        self.mux
            .block(id)
            .map(|block| ActionOutcome::Completed(block.status()))
            .ok_or(Error::CommandNotFound { id })
    }

    fn focus(&self, change: Option<ActiveChange>) {
        if let Some(id) = change.and_then(|change| change.current) {
            let _ = self.focus_tx.send(id);
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.mux.snapshot());
    }

    /// Refresh the snapshot, then answer the caller
    fn respond<T>(&self, reply: Reply<T>, value: T) {
        self.publish_snapshot();
        let _ = reply.send(value);
    }
}

/// Tell the terminal service about focus changes, in order
async fn forward_focus(
    terminal: Arc<dyn TerminalService>,
    mut focus_rx: mpsc::UnboundedReceiver<SessionId>,
) {
    while let Some(id) = focus_rx.recv().await {
        if let Err(e) = guarded(TERMINAL_SERVICE, terminal.set_active_session(id)).await {
            warn!("Failed to focus session {}: {}", id, e);
        }
    }
}

/// Queue a task's result, unless the coordinator has stopped
fn report(tx: &mpsc::WeakUnboundedSender<Command>, command: Command) {
    if let Some(tx) = tx.upgrade() {
        let _ = tx.send(command);
    }
}

/// Await a service call, turning a panic into a service error
async fn guarded<T, F>(service: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("{} panicked: {}", service, message);
            Err(Error::service(service, format!("panicked: {}", message)))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Thread-safe entry point for lifecycle events
///
/// Cloneable, and usable from plain threads as well as async tasks. Events
/// from all sinks are applied in the order they were sent.
///
/// A sink does not keep the coordinator alive: services usually hold one
/// while the coordinator holds the service, so once every
/// [`CoordinatorHandle`] is dropped, sends fail with `CoordinatorClosed`.
#[derive(Clone)]
pub struct LifecycleSink {
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl LifecycleSink {
    /// Queue a lifecycle event
    pub fn send(&self, event: LifecycleEvent) -> Result<()> {
        self.queue(Command::Lifecycle(event))
    }

    fn queue(&self, command: Command) -> Result<()> {
        self.tx
            .upgrade()
            .ok_or(Error::CoordinatorClosed)?
            .send(command)
            .map_err(|_| Error::CoordinatorClosed)
    }

    /// A session was created
    pub fn session_created(&self, session: Session) -> Result<()> {
        self.send(LifecycleEvent::SessionCreated(session))
    }

    /// A session was closed
    pub fn session_closed(&self, session: Session) -> Result<()> {
        self.send(LifecycleEvent::SessionClosed(session))
    }

    /// A session changed state
    pub fn state_changed(
        &self,
        id: SessionId,
        old: SessionState,
        new: SessionState,
        exit_code: Option<i32>,
    ) -> Result<()> {
        self.send(LifecycleEvent::SessionStateChanged {
            id,
            old,
            new,
            exit_code,
        })
    }

    /// A session changed its title
    pub fn title_changed(&self, id: SessionId, title: impl Into<String>) -> Result<()> {
        self.send(LifecycleEvent::TitleChanged {
            id,
            title: title.into(),
        })
    }

    /// The command execution service changed a block's status
    pub fn command_status(&self, update: CommandStatusUpdate) -> Result<()> {
        self.queue(Command::CommandStatus(update))
    }
}

impl std::fmt::Debug for LifecycleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleSink")
            .field(
                "closed",
                &self.tx.upgrade().map_or(true, |tx| tx.is_closed()),
            )
            .finish()
    }
}

/// Handle to a running coordinator (cheap to clone)
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<MultiplexerSnapshot>,
    bus: NotificationBus,
}

impl CoordinatorHandle {
    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| Error::CoordinatorClosed)?;
        rx.await.map_err(|_| Error::CoordinatorClosed)
    }

    async fn panel(&self, op: PanelOp) -> Result<()> {
        self.call(|reply| Command::Panel { op, reply }).await?
    }

    /// Sink for the terminal and command services' events
    pub fn event_sink(&self) -> LifecycleSink {
        LifecycleSink {
            tx: self.tx.downgrade(),
        }
    }

    /// Subscribe to notifications; the subscription is released on drop
    pub fn subscribe(&self) -> NotificationSubscription {
        self.bus.subscribe()
    }

    /// Whether the coordination context is still accepting work
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    // === Snapshots ===

    /// Latest state snapshot
    pub fn snapshot(&self) -> MultiplexerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified whenever the snapshot changes
    pub fn watch_snapshot(&self) -> watch::Receiver<MultiplexerSnapshot> {
        self.snapshot.clone()
    }

    /// Sessions in tab order
    pub fn list_sessions(&self) -> Vec<Session> {
        self.snapshot.borrow().sessions.clone()
    }

    /// The active session, if any
    pub fn active_session(&self) -> Option<Session> {
        self.snapshot.borrow().active_session().cloned()
    }

    // === Sessions ===

    /// Make `id` the active session
    pub async fn activate(&self, id: SessionId) -> Result<Option<ActiveChange>> {
        self.call(|reply| Command::Activate { id, reply }).await?
    }

    /// Activate the session at a tab index
    pub async fn activate_index(&self, index: usize) -> Result<Option<ActiveChange>> {
        self.call(|reply| Command::ActivateIndex { index, reply }).await
    }

    /// Activate the next tab
    pub async fn next(&self) -> Result<Option<ActiveChange>> {
        self.call(|reply| Command::Next { reply }).await
    }

    /// Activate the previous tab
    pub async fn previous(&self) -> Result<Option<ActiveChange>> {
        self.call(|reply| Command::Previous { reply }).await
    }

    /// Ask the terminal service for a new session and register it
    pub async fn create_session(&self, options: SessionOptions) -> Result<SessionId> {
        self.call(|reply| Command::CreateSession { options, reply })
            .await?
    }

    /// Request a session to close
    ///
    /// The session is marked `Closing` at once and removed when the
    /// service reports it closed. If the service refuses, the session
    /// returns to the state it had before and the error is passed on.
    pub async fn close_session(&self, id: SessionId) -> Result<()> {
        self.call(|reply| Command::CloseSession { id, reply }).await?
    }

    /// Forward keyboard input to the active session
    ///
    /// This is the terminal's passthrough for what the user types. Text is
    /// not classified; suggested commands belong in a block and go through
    /// [`execute`](Self::execute) or [`send_to_terminal`](Self::send_to_terminal).
    pub async fn write_to_active(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.call(|reply| Command::WriteToActive { text, reply })
            .await?
    }

    // === Command blocks ===

    /// Register a block produced upstream
    pub async fn register_block(&self, block: CommandBlock) -> Result<CommandId> {
        self.call(|reply| Command::RegisterBlock { block, reply })
            .await
    }

    /// Build, classify and register a block from text
    pub async fn create_block(
        &self,
        text: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<CommandId> {
        let text = text.into();
        let language = language.into();
        self.call(|reply| Command::CreateBlock {
            text,
            language,
            reply,
        })
        .await
    }

    /// Forget a block, cancelling its execution if one is outstanding
    pub async fn remove_block(&self, id: CommandId) -> Result<CommandBlock> {
        self.call(|reply| Command::RemoveBlock { id, reply }).await?
    }

    /// Whether an execute request could start an execution of `id`
    pub async fn is_executable(&self, id: CommandId) -> Result<bool> {
        self.call(|reply| Command::IsExecutable { id, reply })
            .await?
    }

    /// Execute the block in the active session and wait for the outcome
    pub async fn execute(&self, id: CommandId) -> Result<ActionOutcome> {
        self.request(id, GateAction::Execute).await
    }

    /// Type the block into the active session without running it
    pub async fn send_to_terminal(&self, id: CommandId) -> Result<ActionOutcome> {
        self.request(id, GateAction::SendToTerminal).await
    }

    /// Copy the block to the clipboard
    pub async fn copy(&self, id: CommandId) -> Result<ActionOutcome> {
        self.request(id, GateAction::Copy).await
    }

    async fn request(&self, id: CommandId, action: GateAction) -> Result<ActionOutcome> {
        self.call(|reply| Command::Request { id, action, reply })
            .await?
    }

    /// Confirm a dangerous block; the action must be requested again
    pub async fn confirm(&self, id: CommandId) -> Result<()> {
        self.call(|reply| Command::Confirm { id, reply }).await?
    }

    /// Dismiss a danger warning
    pub async fn cancel_warning(&self, id: CommandId) -> Result<()> {
        self.call(|reply| Command::CancelWarning { id, reply })
            .await?
    }

    /// Drop a confirmation granted earlier
    pub async fn reset_confirmation(&self, id: CommandId) -> Result<()> {
        self.call(|reply| Command::ResetConfirmation { id, reply })
            .await?
    }

    /// Cancel an outstanding execution
    ///
    /// Returns `false` when the block was not executing.
    pub async fn cancel(&self, id: CommandId) -> Result<bool> {
        self.call(|reply| Command::Cancel { id, reply }).await?
    }

    // === Panel ===

    /// Show the panel, creating a session if none exists
    pub async fn show_panel(&self) -> Result<()> {
        self.panel(PanelOp::Show).await
    }

    /// Hide the panel
    pub async fn hide_panel(&self) -> Result<()> {
        self.panel(PanelOp::Hide).await
    }

    /// Toggle visibility
    pub async fn toggle_panel(&self) -> Result<()> {
        self.panel(PanelOp::Toggle).await
    }

    /// Maximize the panel
    pub async fn maximize_panel(&self) -> Result<()> {
        self.panel(PanelOp::Maximize).await
    }

    /// Leave maximized mode
    pub async fn restore_panel(&self) -> Result<()> {
        self.panel(PanelOp::Restore).await
    }

    /// Toggle maximized mode
    pub async fn toggle_maximize_panel(&self) -> Result<()> {
        self.panel(PanelOp::ToggleMaximize).await
    }

    /// Resize the panel
    pub async fn set_panel_size(&self, size: f32) -> Result<()> {
        self.panel(PanelOp::Resize(size)).await
    }

    // === Lifecycle ===

    /// Stop the coordination context
    ///
    /// Work queued before the call is applied first; outstanding executions
    /// are cancelled. Fails with `CoordinatorClosed` if already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.call(|reply| Command::Shutdown { reply }).await
    }
}

impl std::fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("running", &self.is_running())
            .field("subscribers", &self.bus.subscriber_count())
            .finish()
    }
}
