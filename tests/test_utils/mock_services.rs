//! In-memory service mocks
//!
//! `MockTerminalService` stands in for the process-owning terminal service:
//! it mints sessions, records focus and input, and reports lifecycle events
//! back through an attached `LifecycleSink`. `MockCommandService` runs
//! command blocks according to a configurable behavior.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use mosaicmux::error::{Error, Result};
use mosaicmux::models::{
    CommandBlock, CommandId, ExecutionResult, Session, SessionId, SessionOptions, SessionState,
};
use mosaicmux::{CommandExecutionService, LifecycleSink, TerminalService};

/// Everything the terminal mock was asked to do
#[derive(Debug, Default)]
pub struct TerminalLog {
    pub created: Vec<SessionOptions>,
    pub closed: Vec<SessionId>,
    pub focused: Vec<SessionId>,
    pub inputs: Vec<(SessionId, String)>,
}

/// Mock terminal service
#[derive(Default)]
pub struct MockTerminalService {
    sink: Mutex<Option<LifecycleSink>>,
    sessions: Mutex<HashMap<SessionId, Session>>,
    log: Mutex<TerminalLog>,
    /// Also report created sessions through the sink
    echo_created: Mutex<bool>,
    fail_create: Mutex<bool>,
    fail_close: Mutex<bool>,
}

impl MockTerminalService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Route lifecycle events to a running coordinator
    pub fn attach(&self, sink: LifecycleSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    /// Report every created session through the sink as well
    pub fn echo_created_events(&self, echo: bool) {
        *self.echo_created.lock().unwrap() = echo;
    }

    pub fn fail_create(&self, fail: bool) {
        *self.fail_create.lock().unwrap() = fail;
    }

    pub fn fail_close(&self, fail: bool) {
        *self.fail_close.lock().unwrap() = fail;
    }

    pub fn created_count(&self) -> usize {
        self.log.lock().unwrap().created.len()
    }

    pub fn closed(&self) -> Vec<SessionId> {
        self.log.lock().unwrap().closed.clone()
    }

    pub fn focused(&self) -> Vec<SessionId> {
        self.log.lock().unwrap().focused.clone()
    }

    pub fn inputs(&self) -> Vec<(SessionId, String)> {
        self.log.lock().unwrap().inputs.clone()
    }

    /// Spawn a session nobody asked for and report it through the sink
    pub fn announce_session(&self) -> Session {
        let session = Session::new(SessionId::new(), "/bin/bash", "/tmp")
            .with_state(SessionState::Running);
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        if let Some(sink) = self.sink() {
            sink.session_created(session.clone()).unwrap();
        }
        session
    }

    /// Simulate the shell process of `id` exiting on its own
    pub fn exit_process(&self, id: SessionId, exit_code: i32) {
        if let Some(sink) = self.sink() {
            sink.state_changed(id, SessionState::Running, SessionState::Exited, Some(exit_code))
                .unwrap();
        }
    }

    fn sink(&self) -> Option<LifecycleSink> {
        self.sink.lock().unwrap().clone()
    }
}

#[async_trait]
impl TerminalService for MockTerminalService {
    async fn create_session(&self, options: SessionOptions) -> Result<Session> {
        if *self.fail_create.lock().unwrap() {
            return Err(Error::service("pty", "no shell available"));
        }
        let shell = options
            .shell
            .clone()
            .unwrap_or_else(|| "/bin/bash".into());
        let cwd = options
            .working_directory
            .clone()
            .unwrap_or_else(|| "/tmp".into());
        let session =
            Session::new(SessionId::new(), shell, cwd).with_state(SessionState::Running);

        self.log.lock().unwrap().created.push(options);
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());

        if *self.echo_created.lock().unwrap() {
            if let Some(sink) = self.sink() {
                sink.session_created(session.clone()).unwrap();
            }
        }
        Ok(session)
    }

    async fn close_session(&self, id: SessionId) -> Result<()> {
        if *self.fail_close.lock().unwrap() {
            return Err(Error::service("pty", "shell ignored hangup"));
        }
        let session = self
            .sessions
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or(Error::SessionNotFound { id })?;
        self.log.lock().unwrap().closed.push(id);
        if let Some(sink) = self.sink() {
            sink.session_closed(session).unwrap();
        }
        Ok(())
    }

    async fn set_active_session(&self, id: SessionId) -> Result<()> {
        self.log.lock().unwrap().focused.push(id);
        Ok(())
    }

    async fn execute_command(&self, id: SessionId, text: &str) -> Result<()> {
        self.log.lock().unwrap().inputs.push((id, text.to_string()));
        Ok(())
    }
}

/// How the command mock answers `execute`
#[derive(Clone)]
pub enum ExecBehavior {
    /// Succeed with the given output
    Succeed(Option<String>),
    /// Report an exit code
    ExitCode(i32),
    /// Return an error
    Fault(String),
    /// Panic inside the service
    Panic,
    /// Never return
    Hang,
    /// Wait until notified, then succeed
    WaitFor(Arc<Notify>),
}

/// One call made to the command mock
#[derive(Debug, Clone, PartialEq)]
pub enum CommandCall {
    Execute {
        id: CommandId,
        session: SessionId,
        capture_output: bool,
    },
    Copy {
        id: CommandId,
    },
    Send {
        id: CommandId,
        session: SessionId,
    },
}

/// Mock command execution service
pub struct MockCommandService {
    behavior: Mutex<ExecBehavior>,
    calls: Mutex<Vec<CommandCall>>,
    fail_copy: Mutex<bool>,
    fail_send: Mutex<bool>,
    /// Signalled when an execute call has started
    pub started: Notify,
}

impl MockCommandService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(ExecBehavior::Succeed(Some("ok".to_string()))),
            calls: Mutex::new(Vec::new()),
            fail_copy: Mutex::new(false),
            fail_send: Mutex::new(false),
            started: Notify::new(),
        })
    }

    pub fn set_behavior(&self, behavior: ExecBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn fail_copy(&self, fail: bool) {
        *self.fail_copy.lock().unwrap() = fail;
    }

    pub fn fail_send(&self, fail: bool) {
        *self.fail_send.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<CommandCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn execute_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, CommandCall::Execute { .. }))
            .count()
    }
}

#[async_trait]
impl CommandExecutionService for MockCommandService {
    async fn execute(
        &self,
        block: &CommandBlock,
        session: SessionId,
        capture_output: bool,
    ) -> Result<ExecutionResult> {
        self.calls.lock().unwrap().push(CommandCall::Execute {
            id: block.id(),
            session,
            capture_output,
        });
        self.started.notify_one();

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            ExecBehavior::Succeed(output) => Ok(ExecutionResult::executed(output)),
            ExecBehavior::ExitCode(code) => {
                Ok(ExecutionResult::executed(None).with_exit_code(code))
            }
            ExecBehavior::Fault(message) => Err(Error::ExecutionFault {
                command: block.text().to_string(),
                reason: message,
            }),
            ExecBehavior::Panic => panic!("command service crashed"),
            ExecBehavior::Hang => std::future::pending().await,
            ExecBehavior::WaitFor(notify) => {
                notify.notified().await;
                Ok(ExecutionResult::executed(Some("late".to_string())))
            }
        }
    }

    async fn copy_to_clipboard(&self, block: &CommandBlock) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(CommandCall::Copy { id: block.id() });
        if *self.fail_copy.lock().unwrap() {
            return Err(Error::service("clipboard", "clipboard unavailable"));
        }
        Ok(())
    }

    async fn send_to_terminal(&self, block: &CommandBlock, session: SessionId) -> Result<()> {
        self.calls.lock().unwrap().push(CommandCall::Send {
            id: block.id(),
            session,
        });
        if *self.fail_send.lock().unwrap() {
            return Err(Error::service("terminal", "session input closed"));
        }
        Ok(())
    }
}
