//! Panel visibility flows and their interaction with session creation

#[path = "../test_utils/mod.rs"]
mod test_utils;

use mosaicmux::config::PanelConfig;
use mosaicmux::Notification;
use test_utils::{create_test_config, wait_until, Harness};

#[tokio::test]
async fn test_toggle_creates_session_only_when_shown() {
    let harness = Harness::spawn();

    harness.handle.toggle_panel().await.unwrap();
    assert!(harness.handle.snapshot().panel.is_visible());
    assert_eq!(harness.terminal.created_count(), 1);

    harness.handle.toggle_panel().await.unwrap();
    assert!(!harness.handle.snapshot().panel.is_visible());
    assert_eq!(harness.terminal.created_count(), 1);

    // The session survives hiding; showing again reuses it
    harness.handle.toggle_panel().await.unwrap();
    assert_eq!(harness.terminal.created_count(), 1);
    assert_eq!(harness.tab_order().len(), 1);
}

#[tokio::test]
async fn test_maximize_shows_panel_and_creates_session() {
    let harness = Harness::spawn();

    harness.handle.maximize_panel().await.unwrap();

    let snapshot = harness.handle.snapshot();
    assert!(snapshot.panel.is_visible());
    assert!(snapshot.panel.is_maximized());
    assert_eq!(snapshot.sessions.len(), 1);
}

#[tokio::test]
async fn test_hide_leaves_maximized_mode() {
    let harness = Harness::spawn();
    harness.handle.maximize_panel().await.unwrap();

    harness.handle.hide_panel().await.unwrap();

    let panel = harness.handle.snapshot().panel;
    assert!(!panel.is_visible());
    assert!(!panel.is_maximized());
}

#[tokio::test]
async fn test_toggle_maximize_round_trip() {
    let harness = Harness::spawn();
    harness.add_session().await;
    harness.handle.show_panel().await.unwrap();

    harness.handle.toggle_maximize_panel().await.unwrap();
    assert!(harness.handle.snapshot().panel.is_maximized());

    harness.handle.toggle_maximize_panel().await.unwrap();
    let panel = harness.handle.snapshot().panel;
    assert!(!panel.is_maximized());
    assert!(panel.is_visible());

    harness.handle.restore_panel().await.unwrap();
    assert!(harness.handle.snapshot().panel.is_visible());
    assert_eq!(harness.terminal.created_count(), 0);
}

#[tokio::test]
async fn test_panel_size_is_clamped() {
    let harness = Harness::spawn();
    let bounds = PanelConfig::default();

    harness.handle.set_panel_size(10_000.0).await.unwrap();
    assert_eq!(harness.handle.snapshot().panel.size(), bounds.max_size);

    harness.handle.set_panel_size(1.0).await.unwrap();
    assert_eq!(harness.handle.snapshot().panel.size(), bounds.min_size);

    harness.handle.set_panel_size(f32::NAN).await.unwrap();
    assert_eq!(harness.handle.snapshot().panel.size(), bounds.min_size);
}

#[tokio::test]
async fn test_panel_changes_are_notified_once() {
    let harness = Harness::spawn();
    harness.add_session().await;
    let mut notifications = harness.handle.subscribe();

    harness.handle.show_panel().await.unwrap();
    harness.handle.show_panel().await.unwrap();

    let panel_changes: Vec<Notification> = notifications
        .drain()
        .into_iter()
        .filter(|n| matches!(n, Notification::PanelChanged { .. }))
        .collect();
    assert_eq!(panel_changes.len(), 1);
    assert!(matches!(
        panel_changes[0],
        Notification::PanelChanged {
            visible: true,
            maximized: false,
            ..
        }
    ));
}

#[tokio::test]
async fn test_show_panel_reports_create_failure() {
    let harness = Harness::spawn();
    harness.terminal.fail_create(true);

    let result = harness.handle.show_panel().await;
    assert!(result.is_err());
    assert!(harness.handle.snapshot().panel.is_visible());
    assert!(harness.tab_order().is_empty());

    // A later show retries once the terminal recovers
    harness.terminal.fail_create(false);
    harness.handle.hide_panel().await.unwrap();
    harness.handle.show_panel().await.unwrap();
    assert_eq!(harness.tab_order().len(), 1);
}

#[tokio::test]
async fn test_start_visible_panel_creates_initial_session() {
    let mut config = create_test_config();
    config.panel.start_visible = true;
    let harness = Harness::spawn_with(config);

    let handle = harness.handle.clone();
    assert!(wait_until(|| handle.list_sessions().len() == 1).await);
    assert!(harness.handle.snapshot().has_active_session());
    assert_eq!(harness.terminal.created_count(), 1);
}
