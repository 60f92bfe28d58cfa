//! Lifecycle Events and Notifications
//!
//! Two directions of traffic pass through this module:
//!
//! - [`LifecycleEvent`] and [`CommandStatusUpdate`] flow *in* from the
//!   external services and are applied by the coordination context
//! - [`Notification`] flows *out* to UI/controller code over a
//!   [`NotificationBus`], emitted in the same step as the change it reports

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::models::{CommandId, CommandStatus, Session, SessionId, SessionState};

/// Session lifecycle event reported by the terminal service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// A session was created; it is appended and auto-activated
    SessionCreated(Session),
    /// A session went away; it is removed and the active pointer reassigned
    SessionClosed(Session),
    /// A session moved to a new lifecycle state
    SessionStateChanged {
        /// Session the change applies to
        id: SessionId,
        /// State the service saw before the change
        old: SessionState,
        /// New state
        new: SessionState,
        /// Exit code, meaningful for `Exited` and `Error`
        exit_code: Option<i32>,
    },
    /// A session changed its display title
    TitleChanged {
        /// Session the change applies to
        id: SessionId,
        /// New title
        title: String,
    },
}

impl LifecycleEvent {
    /// Session the event refers to
    pub fn session_id(&self) -> SessionId {
        match self {
            LifecycleEvent::SessionCreated(session) | LifecycleEvent::SessionClosed(session) => {
                session.id
            }
            LifecycleEvent::SessionStateChanged { id, .. }
            | LifecycleEvent::TitleChanged { id, .. } => *id,
        }
    }

    /// Short name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::SessionCreated(_) => "created",
            LifecycleEvent::SessionClosed(_) => "closed",
            LifecycleEvent::SessionStateChanged { .. } => "state-changed",
            LifecycleEvent::TitleChanged { .. } => "title-changed",
        }
    }
}

/// Status change reported by the command execution service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStatusUpdate {
    /// Command the change applies to
    pub command_id: CommandId,
    /// Status the service saw before the change
    pub old: CommandStatus,
    /// New, authoritative status
    pub new: CommandStatus,
}

/// Notification emitted to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// The active session changed; `current` is `None` once the registry is empty
    ActiveSessionChanged {
        /// Previously active session
        previous: Option<SessionId>,
        /// Newly active session
        current: Option<SessionId>,
    },
    /// A session was appended at `index`
    SessionAdded {
        /// New session
        id: SessionId,
        /// Tab index
        index: usize,
    },
    /// A session was removed from `index`
    SessionRemoved {
        /// Removed session
        id: SessionId,
        /// Former tab index
        index: usize,
    },
    /// State or title of a session changed
    SessionUpdated {
        /// Updated session
        id: SessionId,
    },
    /// A dangerous command is waiting for confirmation
    WarningRequested {
        /// Command held back
        command_id: CommandId,
        /// Warning to show
        warning: String,
    },
    /// A command block changed status
    CommandStatusChanged {
        /// Command block
        command_id: CommandId,
        /// Previous status
        old: CommandStatus,
        /// New status
        new: CommandStatus,
    },
    /// Panel flags or size changed
    PanelChanged {
        /// Panel shown
        visible: bool,
        /// Panel maximized
        maximized: bool,
        /// Panel size
        size: f32,
    },
}

/// Subscription handle for receiving notifications
///
/// Counted as an active subscriber until dropped.
pub struct NotificationSubscription {
    receiver: broadcast::Receiver<Notification>,
    active_subscribers: Arc<AtomicUsize>,
}

impl NotificationSubscription {
    /// Receive the next notification, waiting if necessary
    ///
    /// Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("Notification subscriber lagged by {} notifications", count);
                }
            }
        }
    }

    /// Try to receive a notification without waiting
    pub fn try_recv(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!("Notification subscriber lagged by {} notifications", count);
                }
            }
        }
    }

    /// Drain every notification currently buffered
    pub fn drain(&mut self) -> Vec<Notification> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Drop for NotificationSubscription {
    fn drop(&mut self) {
        self.active_subscribers.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Broadcast bus for notifications
#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
    active_subscribers: Arc<AtomicUsize>,
}

impl NotificationBus {
    /// Create a bus buffering `capacity` notifications per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            active_subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Subscribe to notifications published from now on
    pub fn subscribe(&self) -> NotificationSubscription {
        self.active_subscribers.fetch_add(1, Ordering::AcqRel);
        NotificationSubscription {
            receiver: self.sender.subscribe(),
            active_subscribers: Arc::clone(&self.active_subscribers),
        }
    }

    /// Publish to all current subscribers
    pub fn publish(&self, notification: Notification) {
        trace!("Notification: {:?}", notification);
        // An error only means nobody is subscribed
        let _ = self.sender.send(notification);
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.active_subscribers.load(Ordering::Acquire)
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
