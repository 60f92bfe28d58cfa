//! Terminal Session Model
//!
//! A session is the orchestrator's record of one interactive shell process.
//! The process itself is spawned and owned by the external terminal
//! service; this record only tracks identity, lifecycle and display data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use super::ShellKind;

/// Opaque, unique session identifier minted by the terminal service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an identifier minted elsewhere
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a session
///
/// `Starting → Running → {Exited, Error} → Closing`. `Closing` is only
/// reached through an explicit close request; `Exited`/`Error` may happen
/// on their own when the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// Process is being spawned
    #[default]
    Starting,
    /// Process is running and accepting input
    Running,
    /// Process ended on its own
    Exited,
    /// Process failed
    Error,
    /// Close was requested, removal pending
    Closing,
}

impl SessionState {
    /// A session is ended once its process exited or failed
    pub fn is_ended(&self) -> bool {
        matches!(self, SessionState::Exited | SessionState::Error)
    }

    /// Whether `next` is a transition the lifecycle allows from `self`
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Starting, Running | Exited | Error | Closing) => true,
            (Running, Exited | Error | Closing) => true,
            (Exited | Error, Closing) => true,
            (Exited, Error) | (Error, Exited) => true,
            _ => false,
        }
    }
}

/// Options passed to the terminal service when requesting a new session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Shell executable; the service picks its default when `None`
    pub shell: Option<PathBuf>,
    /// Initial working directory
    pub working_directory: Option<PathBuf>,
    /// Initial display title
    pub title: Option<String>,
}

/// One interactive shell session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,

    /// Shell executable path (used only to classify the shell kind)
    pub shell_path: PathBuf,

    /// Current lifecycle state
    pub state: SessionState,

    /// Display title reported by the shell, if any
    pub title: Option<String>,

    /// Current working directory
    pub working_directory: PathBuf,

    /// Exit code, only set once the session has ended
    pub exit_code: Option<i32>,

    /// Whether this session currently holds focus
    pub focused: bool,

    /// When the session was registered
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session record in the `Starting` state
    pub fn new(
        id: SessionId,
        shell_path: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            shell_path: shell_path.into(),
            state: SessionState::Starting,
            title: None,
            working_directory: working_directory.into(),
            exit_code: None,
            focused: false,
            created_at: Utc::now(),
        }
    }

    /// Set the initial title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the initial state
    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    /// Kind of shell, derived from the executable path
    pub fn shell_kind(&self) -> ShellKind {
        ShellKind::from_path(&self.shell_path.to_string_lossy())
    }

    /// Title to show on the tab
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.clone(),
            _ => self.shell_kind().display_name().to_string(),
        }
    }

    /// Whether the shell process has ended
    pub fn is_ended(&self) -> bool {
        self.state.is_ended()
    }

    /// Apply a state change reported by the terminal service
    ///
    /// The exit code is only recorded when the new state is an ended state;
    /// moving on to `Closing` keeps the code already recorded.
    pub(crate) fn apply_state(&mut self, state: SessionState, exit_code: Option<i32>) {
        self.state = state;
        if state.is_ended() {
            self.exit_code = exit_code.or(self.exit_code);
        } else if state != SessionState::Closing {
            self.exit_code = None;
        }
    }
}
