//! Test fixtures and helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mosaicmux::models::{CommandBlock, Session, SessionId, SessionState};
use mosaicmux::{Config, Coordinator, CoordinatorHandle};

use super::mock_services::{MockCommandService, MockTerminalService};

/// A running coordinator wired to mock services
pub struct Harness {
    pub handle: CoordinatorHandle,
    pub terminal: Arc<MockTerminalService>,
    pub commands: Arc<MockCommandService>,
}

impl Harness {
    /// Spawn with default configuration
    pub fn spawn() -> Self {
        Self::spawn_with(create_test_config())
    }

    /// Spawn with the given configuration
    pub fn spawn_with(config: Config) -> Self {
        let terminal = MockTerminalService::new();
        let commands = MockCommandService::new();
        let handle = Coordinator::spawn(&config, terminal.clone(), commands.clone())
            .expect("coordinator should start");
        terminal.attach(handle.event_sink());
        Self {
            handle,
            terminal,
            commands,
        }
    }

    /// Wait until everything queued so far has been applied
    pub async fn flush(&self) {
        let _ = self.handle.activate_index(usize::MAX).await;
    }

    /// Have the terminal report a new session and wait for it
    pub async fn add_session(&self) -> SessionId {
        let id = self.terminal.announce_session().id;
        self.flush().await;
        id
    }

    /// Active session id from the latest snapshot
    pub fn active(&self) -> Option<SessionId> {
        self.handle.snapshot().active
    }

    /// Session ids in tab order from the latest snapshot
    pub fn tab_order(&self) -> Vec<SessionId> {
        self.handle.list_sessions().iter().map(|s| s.id).collect()
    }
}

/// Default configuration with auditing on
pub fn create_test_config() -> Config {
    Config::default()
}

/// A running bash session record
pub fn create_test_session() -> Session {
    Session::new(SessionId::new(), "/bin/bash", "/tmp").with_state(SessionState::Running)
}

/// A harmless command block
pub fn create_safe_block() -> CommandBlock {
    CommandBlock::new("ls -la", "bash").with_confidence(0.9)
}

/// A block flagged dangerous by its producer
pub fn create_dangerous_block() -> CommandBlock {
    CommandBlock::new("rm -rf ./build", "bash").with_danger("Recursively deletes files")
}

/// Poll `condition` until it holds or a second passes
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
