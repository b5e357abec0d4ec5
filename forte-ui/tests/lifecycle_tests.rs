//! Tab lifecycle tests
//!
//! Tests cover:
//! - Load/unload/reload transitions and their no-op cases
//! - Error block on fetch and render failures, recovery by reload
//! - Cancellation never reaching render
//! - Cancelled or failed reloads releasing the previous render
//! - Listener disposal and the update contract

mod helpers;

use forte_common::{EventBus, LifecycleEvent, Role, SessionInfo, TabState};
use forte_ui::{FetchError, LoadOutcome, Tab, TabError, UiEvent};
use helpers::recorder::payload;
use helpers::{admin_session, Recorder, RecordingTab, ReloadOnClick};
use tokio::sync::Notify;
use std::sync::Arc;

#[tokio::test]
async fn test_second_load_without_unload_is_noop() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()));

    assert_eq!(tab.on_load(admin_session()).await, Ok(LoadOutcome::Loaded));
    assert_eq!(tab.on_load(admin_session()).await, Ok(LoadOutcome::AlreadyLoaded));

    assert_eq!(recorder.fetches(), 1);
    assert_eq!(recorder.renders(), 1);
    assert_eq!(tab.state(), TabState::Loaded);
    assert_eq!(tab.html(), r#"<p class="recorded">a data</p>"#);
}

#[tokio::test]
async fn test_unload_then_load_runs_exactly_one_cycle() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()));

    tab.on_load(admin_session()).await.unwrap();
    tab.on_unload();

    assert_eq!(tab.state(), TabState::Unloaded);
    assert!(tab.html().is_empty());
    assert!(tab.data().is_none());
    assert!(tab.session().is_none());
    assert_eq!(recorder.cleanups(), 1);

    tab.on_load(admin_session()).await.unwrap();
    assert_eq!(recorder.fetches(), 2);
    assert_eq!(recorder.renders(), 2);
    assert_eq!(tab.completed_loads(), 2);
    assert_eq!(
        recorder.log(),
        vec!["fetch:a", "render:a", "cleanup:a", "fetch:a", "render:a"]
    );
}

#[tokio::test]
async fn test_unload_when_not_loaded_is_noop() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()));

    tab.on_unload();
    assert_eq!(tab.state(), TabState::Unloaded);
    assert_eq!(recorder.cleanups(), 0);
}

#[tokio::test]
async fn test_reload_with_unchanged_data_is_identical() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()));

    tab.on_load(admin_session()).await.unwrap();
    let before = tab.html().to_string();

    assert_eq!(tab.reload().await, Ok(LoadOutcome::Loaded));
    assert_eq!(tab.html(), before);
    assert_eq!(recorder.fetches(), 2);
    // Reload keeps the session and does not run cleanup
    assert_eq!(recorder.cleanups(), 0);
    assert!(tab.session().is_some());
}

#[tokio::test]
async fn test_reload_without_session_is_skipped() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()));

    assert_eq!(tab.reload().await, Ok(LoadOutcome::Skipped));
    assert_eq!(recorder.fetches(), 0);
    assert_eq!(tab.state(), TabState::Unloaded);
}

#[tokio::test]
async fn test_network_failure_shows_error_block_and_reload_recovers() {
    let recorder = Recorder::new();
    let result = payload(Err(FetchError::Network("connection refused".into())));
    let mut tab = Tab::new(
        "parent-schedule",
        RecordingTab::new("s", recorder.clone()).with_payload(result.clone()),
    );

    let outcome = tab.on_load(admin_session()).await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Failed {
            message: "Network error: connection refused".into()
        }
    );
    assert_eq!(tab.state(), TabState::Error);
    assert!(tab.view().shows_error());
    assert!(tab.html().contains("connection refused"));
    assert!(tab.html().contains(r#"data-action="reload-page""#));
    assert_eq!(recorder.renders(), 0);

    *result.lock().unwrap() = Ok("back online".into());
    assert_eq!(tab.reload().await, Ok(LoadOutcome::Loaded));
    assert_eq!(tab.state(), TabState::Loaded);
    assert!(!tab.view().shows_error());
    assert!(tab.html().contains("back online"));
}

#[tokio::test]
async fn test_load_from_error_is_fresh_load() {
    let recorder = Recorder::new();
    let result = payload(Err(FetchError::Status {
        status: 500,
        message: "boom".into(),
    }));
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()).with_payload(result.clone()));

    tab.on_load(admin_session()).await.unwrap();
    assert_eq!(tab.state(), TabState::Error);

    *result.lock().unwrap() = Ok("fine".into());
    assert_eq!(tab.on_load(admin_session()).await, Ok(LoadOutcome::Loaded));
}

#[tokio::test]
async fn test_render_failure_shows_error_without_partial_markup() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()).failing_render());

    let outcome = tab.on_load(admin_session()).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    assert_eq!(tab.state(), TabState::Error);
    assert!(tab.html().contains("cannot draw a"));
    assert!(!tab.html().contains("recorded"));
    assert_eq!(tab.listener_count(), 0);
}

#[tokio::test]
async fn test_cancelled_fetch_never_renders() {
    let recorder = Recorder::new();
    let gate = Arc::new(Notify::new());
    let mut tab = Tab::new(
        "a",
        RecordingTab::new("a", recorder.clone())
            .gated(gate.clone())
            .ignoring_cancel(),
    );
    let abort = tab.abort_handle();

    let (outcome, _) = tokio::join!(tab.on_load(admin_session()), async {
        tokio::task::yield_now().await;
        // Data arrives and the cycle is cancelled in the same instant
        gate.notify_one();
        abort.cancel();
    });

    assert_eq!(outcome, Ok(LoadOutcome::Cancelled));
    assert_eq!(recorder.fetches(), 1);
    assert_eq!(recorder.renders(), 0);
    assert_eq!(tab.state(), TabState::Unloaded);
    assert!(tab.html().is_empty());

    // A fresh token is armed for the next cycle
    gate.notify_one();
    assert_eq!(tab.on_load(admin_session()).await, Ok(LoadOutcome::Loaded));
    assert_eq!(recorder.renders(), 1);
}

#[tokio::test]
async fn test_cancelled_reload_releases_previous_render() {
    let recorder = Recorder::new();
    let gate = Arc::new(Notify::new());
    let mut tab = Tab::new(
        "a",
        RecordingTab::new("a", recorder.clone())
            .gated(gate.clone())
            .with_listener(),
    );
    gate.notify_one();
    tab.on_load(admin_session()).await.unwrap();

    // The handle taken after prepare_reload belongs to the reload's cycle
    assert!(tab.prepare_reload());
    let abort = tab.abort_handle();
    let (outcome, _) = tokio::join!(tab.run_reload(), async {
        tokio::task::yield_now().await;
        abort.cancel();
    });

    assert_eq!(outcome, Ok(LoadOutcome::Cancelled));
    assert_eq!(tab.state(), TabState::Unloaded);
    assert_eq!(recorder.cleanups(), 1);
    assert_eq!(tab.listener_count(), 0);
    assert!(tab.data().is_none());
    assert!(tab.html().is_empty());
    assert_eq!(
        recorder.log(),
        vec!["fetch:a", "render:a", "fetch:a", "cleanup:a"]
    );

    // Nothing left to release
    tab.on_unload();
    assert_eq!(recorder.cleanups(), 1);
}

#[tokio::test]
async fn test_failed_reload_releases_previous_render() {
    let recorder = Recorder::new();
    let result = payload(Ok("first"));
    let mut tab = Tab::new(
        "a",
        RecordingTab::new("a", recorder.clone()).with_payload(result.clone()),
    );
    tab.on_load(admin_session()).await.unwrap();

    *result.lock().unwrap() = Err(FetchError::Network("connection reset".into()));
    assert!(matches!(
        tab.reload().await,
        Ok(LoadOutcome::Failed { .. })
    ));
    assert_eq!(tab.state(), TabState::Error);
    assert_eq!(recorder.cleanups(), 1);

    // Unload from Error is a no-op, so cleanup stays at one
    tab.on_unload();
    assert_eq!(recorder.cleanups(), 1);

    // A failed first load held no render and runs no cleanup
    let fresh = Recorder::new();
    let mut other = Tab::new(
        "b",
        RecordingTab::new("b", fresh.clone())
            .with_payload(payload(Err(FetchError::Network("down".into())))),
    );
    other.on_load(admin_session()).await.unwrap();
    assert_eq!(fresh.cleanups(), 0);
}

#[tokio::test]
async fn test_dispatch_reload_runs_one_cycle() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", ReloadOnClick(RecordingTab::new("a", recorder.clone())));
    tab.on_load(admin_session()).await.unwrap();

    assert_eq!(tab.dispatch("record-button", UiEvent::Click).await, Ok(1));
    assert_eq!(tab.state(), TabState::Loaded);
    assert_eq!(tab.completed_loads(), 2);
    assert_eq!(recorder.cleanups(), 0);
}

#[tokio::test]
async fn test_listeners_disposed_on_unload() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()).with_listener());

    tab.on_load(admin_session()).await.unwrap();
    assert_eq!(tab.listener_count(), 1);

    tab.on_unload();
    assert_eq!(tab.listener_count(), 0);
    assert_eq!(tab.dispatch("record-button", UiEvent::Click).await, Ok(0));
}

#[tokio::test]
async fn test_unhandled_listener_message_is_contract_violation() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()).with_listener());
    tab.on_load(admin_session()).await.unwrap();

    let result = tab.dispatch("record-button", UiEvent::Click).await;
    assert!(matches!(result, Err(TabError::ContractViolation(_))));
    assert_eq!(tab.state(), TabState::Error);

    // Events on other targets are ignored
    assert_eq!(tab.dispatch("elsewhere", UiEvent::Click).await, Ok(0));
}

#[tokio::test]
async fn test_session_change_updates_without_refetch() {
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone()));

    // Ignored before load
    tab.on_session_change(admin_session());
    assert_eq!(recorder.session_changes(), 0);

    tab.on_load(admin_session()).await.unwrap();
    let refreshed = SessionInfo::for_user("admin-1", Role::Admin).with_access_code("new-code");
    tab.on_session_change(refreshed.clone());

    assert_eq!(recorder.session_changes(), 1);
    assert_eq!(recorder.fetches(), 1);
    assert_eq!(tab.session(), Some(&refreshed));
}

#[tokio::test]
async fn test_state_changes_are_broadcast() {
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let recorder = Recorder::new();
    let mut tab = Tab::new("a", RecordingTab::new("a", recorder.clone())).with_event_bus(bus);

    tab.on_load(admin_session()).await.unwrap();
    tab.on_unload();

    let mut transitions = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let LifecycleEvent::TabStateChanged {
            tab_id,
            old_state,
            new_state,
            ..
        } = event
        {
            assert_eq!(tab_id, "a");
            transitions.push((old_state, new_state));
        }
    }

    assert_eq!(
        transitions,
        vec![
            (TabState::Unloaded, TabState::Loading),
            (TabState::Loading, TabState::Loaded),
            (TabState::Loaded, TabState::Unloaded),
        ]
    );
}
