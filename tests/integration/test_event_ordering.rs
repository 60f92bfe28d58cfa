//! Ordering guarantees for lifecycle events from concurrent producers

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::collections::HashMap;
use std::thread;

use mosaicmux::events::CommandStatusUpdate;
use mosaicmux::models::{CommandStatus, SessionId, SessionState};
use mosaicmux::Notification;
use test_utils::{create_safe_block, create_test_session, Harness};

const PRODUCERS: usize = 4;
const SESSIONS_PER_PRODUCER: usize = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_producers_keep_per_producer_order() {
    let harness = Harness::spawn();

    let workers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let sink = harness.handle.event_sink();
            thread::spawn(move || {
                let mut sent = Vec::with_capacity(SESSIONS_PER_PRODUCER);
                for _ in 0..SESSIONS_PER_PRODUCER {
                    let session = create_test_session();
                    sent.push(session.id);
                    sink.session_created(session).unwrap();
                }
                sent
            })
        })
        .collect();
    let sent: Vec<Vec<SessionId>> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    harness.flush().await;

    let order = harness.tab_order();
    assert_eq!(order.len(), PRODUCERS * SESSIONS_PER_PRODUCER);

    let position: HashMap<SessionId, usize> =
        order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    for ids in &sent {
        let positions: Vec<usize> = ids.iter().map(|id| position[id]).collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    // Every created session was activated as it arrived
    assert_eq!(harness.active(), order.last().copied());
}

#[tokio::test]
async fn test_notifications_follow_event_order() {
    let harness = Harness::spawn();
    let sink = harness.handle.event_sink();
    let mut notifications = harness.handle.subscribe();

    let a = create_test_session();
    let b = create_test_session();
    let (a_id, b_id) = (a.id, b.id);

    sink.session_created(a.clone()).unwrap();
    sink.state_changed(a_id, SessionState::Running, SessionState::Exited, Some(0))
        .unwrap();
    sink.session_closed(a).unwrap();
    sink.session_created(b).unwrap();
    harness.flush().await;

    let expected = vec![
        Notification::SessionAdded { id: a_id, index: 0 },
        Notification::ActiveSessionChanged {
            previous: None,
            current: Some(a_id),
        },
        Notification::SessionUpdated { id: a_id },
        Notification::SessionRemoved { id: a_id, index: 0 },
        Notification::ActiveSessionChanged {
            previous: Some(a_id),
            current: None,
        },
        Notification::SessionAdded { id: b_id, index: 0 },
        Notification::ActiveSessionChanged {
            previous: None,
            current: Some(b_id),
        },
    ];
    assert_eq!(notifications.drain(), expected);
}

#[tokio::test]
async fn test_events_for_closed_sessions_are_dropped() {
    let harness = Harness::spawn();
    let sink = harness.handle.event_sink();
    let session = create_test_session();
    let id = session.id;

    sink.session_created(session.clone()).unwrap();
    sink.session_closed(session.clone()).unwrap();
    harness.flush().await;

    let mut notifications = harness.handle.subscribe();
    sink.title_changed(id, "late").unwrap();
    sink.state_changed(id, SessionState::Running, SessionState::Exited, Some(1))
        .unwrap();
    sink.session_closed(session).unwrap();
    harness.flush().await;

    assert!(harness.tab_order().is_empty());
    assert!(notifications.drain().is_empty());
    assert!(harness.handle.is_running());
}

#[tokio::test]
async fn test_duplicate_created_event_is_ignored() {
    let harness = Harness::spawn();
    let sink = harness.handle.event_sink();
    let session = create_test_session();

    sink.session_created(session.clone()).unwrap();
    sink.session_created(session.clone()).unwrap();
    harness.flush().await;

    assert_eq!(harness.tab_order(), vec![session.id]);
}

#[tokio::test]
async fn test_external_status_update_is_applied_in_order() {
    let harness = Harness::spawn();
    let id = harness.handle.register_block(create_safe_block()).await.unwrap();
    let mut notifications = harness.handle.subscribe();

    harness
        .handle
        .event_sink()
        .command_status(CommandStatusUpdate {
            command_id: id,
            old: CommandStatus::Pending,
            new: CommandStatus::Executed,
        })
        .unwrap();

    assert!(!harness.handle.is_executable(id).await.unwrap());
    assert_eq!(
        notifications.drain(),
        vec![Notification::CommandStatusChanged {
            command_id: id,
            old: CommandStatus::Pending,
            new: CommandStatus::Executed,
        }]
    );
}

#[tokio::test]
async fn test_snapshot_watchers_see_applied_events() {
    let harness = Harness::spawn();
    let mut watcher = harness.handle.watch_snapshot();
    let _ = watcher.borrow_and_update();

    let id = harness.terminal.announce_session().id;
    watcher.changed().await.unwrap();

    let snapshot = watcher.borrow().clone();
    assert_eq!(snapshot.active, Some(id));
}

#[tokio::test]
async fn test_dropped_subscription_does_not_block_producers() {
    let harness = Harness::spawn();
    let subscription = harness.handle.subscribe();
    drop(subscription);

    for _ in 0..10 {
        harness.terminal.announce_session();
    }
    harness.flush().await;
    assert_eq!(harness.tab_order().len(), 10);
}
