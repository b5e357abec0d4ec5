//! Tab controller tests
//!
//! Tests cover:
//! - Single active tab, unload-before-load ordering
//! - Superseding activations (queued and in-flight)
//! - Activations and deactivations cancelling in-flight reloads and loads
//! - Unknown tabs, re-registration, failed loads and reload
//! - Session propagation, deactivate and shutdown

mod helpers;

use std::sync::Arc;

use forte_common::{LifecycleEvent, Role, SessionInfo, SlotState, TabState};
use forte_ui::{
    ActivationOutcome, ControllerError, FetchError, LoadOutcome, Tab, TabController, UiEvent,
};
use helpers::recorder::payload;
use helpers::{admin_session, Recorder, RecordingTab, ReloadOnClick};
use tokio::sync::Notify;

fn recording_tab(name: &str, recorder: &Arc<Recorder>) -> Tab<RecordingTab> {
    Tab::new(name, RecordingTab::new(name, recorder.clone()))
}

async fn wait_for_slot(controller: &TabController, slot: SlotState) {
    let mut rx = controller.watch();
    rx.wait_for(|snapshot| snapshot.slot == slot)
        .await
        .expect("controller stopped");
}

#[tokio::test]
async fn test_activate_loads_target() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    controller.register_tab("a", recording_tab("a", &recorder));

    let outcome = controller.activate("a", admin_session()).await.unwrap();
    assert_eq!(outcome, ActivationOutcome::Activated { tab_id: "a".into() });

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.slot, SlotState::Active("a".into()));
    assert_eq!(snapshot.active.as_deref(), Some("a"));
    assert_eq!(snapshot.tab_state("a"), Some(TabState::Loaded));

    let tab = controller.inspect("a").await.unwrap().unwrap();
    assert_eq!(tab.html, r#"<p class="recorded">a data</p>"#);
}

#[tokio::test]
async fn test_switch_unloads_previous_before_loading_next() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    controller.register_tab("a", recording_tab("a", &recorder));
    controller.register_tab("b", recording_tab("b", &recorder));

    controller.activate("a", admin_session()).await.unwrap();
    controller.activate("b", admin_session()).await.unwrap();

    assert_eq!(
        recorder.log(),
        vec!["fetch:a", "render:a", "cleanup:a", "fetch:b", "render:b"]
    );
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.tab_state("a"), Some(TabState::Unloaded));
    assert_eq!(snapshot.tab_state("b"), Some(TabState::Loaded));
    assert!(controller.inspect("a").await.unwrap().unwrap().html.is_empty());
}

#[tokio::test]
async fn test_activating_active_tab_is_noop() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    controller.register_tab("a", recording_tab("a", &recorder));

    controller.activate("a", admin_session()).await.unwrap();
    let outcome = controller.activate("a", admin_session()).await.unwrap();

    assert_eq!(outcome, ActivationOutcome::AlreadyActive { tab_id: "a".into() });
    assert_eq!(recorder.fetches(), 1);
    assert_eq!(recorder.cleanups(), 0);
}

#[tokio::test]
async fn test_rapid_activations_latest_wins() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    for id in ["t1", "t2", "t3"] {
        controller.register_tab(id, recording_tab(id, &recorder));
    }

    let first = controller.activate("t1", admin_session());
    let second = controller.activate("t2", admin_session());
    let third = controller.activate("t3", admin_session());

    assert_eq!(
        first.await.unwrap(),
        ActivationOutcome::Superseded {
            tab_id: "t1".into(),
            by: "t2".into()
        }
    );
    assert_eq!(
        second.await.unwrap(),
        ActivationOutcome::Superseded {
            tab_id: "t2".into(),
            by: "t3".into()
        }
    );
    assert_eq!(
        third.await.unwrap(),
        ActivationOutcome::Activated { tab_id: "t3".into() }
    );

    // Stale targets never render
    assert_eq!(recorder.log(), vec!["fetch:t3", "render:t3"]);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.tab_state("t1"), Some(TabState::Unloaded));
    assert_eq!(snapshot.tab_state("t2"), Some(TabState::Unloaded));
    assert_eq!(snapshot.tab_state("t3"), Some(TabState::Loaded));
}

#[tokio::test]
async fn test_activation_during_fetch_aborts_it() {
    let controller = TabController::new();
    let mut events = controller.events().subscribe();
    let recorder = Recorder::new();
    let gate = Arc::new(Notify::new());
    controller.register_tab(
        "a",
        Tab::new("a", RecordingTab::new("a", recorder.clone()).gated(gate.clone())),
    );
    controller.register_tab("b", recording_tab("b", &recorder));

    let pending_a = controller.activate("a", admin_session());
    wait_for_slot(&controller, SlotState::Activating("a".into())).await;
    assert_eq!(recorder.fetches(), 1);

    let pending_b = controller.activate("b", admin_session());

    assert_eq!(
        pending_a.await.unwrap(),
        ActivationOutcome::Superseded {
            tab_id: "a".into(),
            by: "b".into()
        }
    );
    assert_eq!(
        pending_b.await.unwrap(),
        ActivationOutcome::Activated { tab_id: "b".into() }
    );

    // A never rendered; its late data has nowhere to go
    gate.notify_one();
    assert_eq!(recorder.log(), vec!["fetch:a", "fetch:b", "render:b"]);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.tab_state("a"), Some(TabState::Unloaded));
    assert_eq!(snapshot.tab_state("b"), Some(TabState::Loaded));
    assert_eq!(snapshot.active.as_deref(), Some("b"));

    let mut superseded = false;
    while let Ok(event) = events.try_recv() {
        if let LifecycleEvent::ActivationSuperseded {
            requested,
            superseded_by,
            ..
        } = event
        {
            assert_eq!((requested.as_str(), superseded_by.as_str()), ("a", "b"));
            superseded = true;
        }
    }
    assert!(superseded);
}

#[tokio::test]
async fn test_activation_during_reload_cancels_it() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    let gate = Arc::new(Notify::new());
    controller.register_tab(
        "a",
        Tab::new("a", RecordingTab::new("a", recorder.clone()).gated(gate.clone())),
    );
    controller.register_tab("b", recording_tab("b", &recorder));

    // First fetch passes; the reload's fetch waits on a gate that never opens
    gate.notify_one();
    controller.activate("a", admin_session()).await.unwrap();

    let (reload, switched) = tokio::join!(controller.reload_active(), async {
        wait_for_slot(&controller, SlotState::Activating("a".into())).await;
        controller.activate("b", admin_session()).await
    });

    assert_eq!(reload, Ok(LoadOutcome::Cancelled));
    assert_eq!(
        switched.unwrap(),
        ActivationOutcome::Activated { tab_id: "b".into() }
    );
    assert_eq!(
        recorder.log(),
        vec!["fetch:a", "render:a", "fetch:a", "cleanup:a", "fetch:b", "render:b"]
    );
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.tab_state("a"), Some(TabState::Unloaded));
    assert_eq!(snapshot.active.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_activation_during_event_reload_cancels_it() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    let gate = Arc::new(Notify::new());
    controller.register_tab(
        "a",
        Tab::new(
            "a",
            ReloadOnClick(RecordingTab::new("a", recorder.clone()).gated(gate.clone())),
        ),
    );
    controller.register_tab("b", recording_tab("b", &recorder));

    gate.notify_one();
    controller.activate("a", admin_session()).await.unwrap();

    let (handled, switched) = tokio::join!(
        controller.dispatch("record-button", UiEvent::Click),
        async {
            wait_for_slot(&controller, SlotState::Activating("a".into())).await;
            controller.activate("b", admin_session()).await
        }
    );

    assert_eq!(handled, Ok(1));
    assert_eq!(
        switched.unwrap(),
        ActivationOutcome::Activated { tab_id: "b".into() }
    );
    assert_eq!(
        recorder.log(),
        vec!["fetch:a", "render:a", "fetch:a", "cleanup:a", "fetch:b", "render:b"]
    );
    assert_eq!(controller.snapshot().slot, SlotState::Active("b".into()));
}

#[tokio::test]
async fn test_deactivate_during_load_cancels_it() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    let gate = Arc::new(Notify::new());
    controller.register_tab(
        "a",
        Tab::new("a", RecordingTab::new("a", recorder.clone()).gated(gate.clone())),
    );

    let pending_a = controller.activate("a", admin_session());
    wait_for_slot(&controller, SlotState::Activating("a".into())).await;

    let (outcome, deactivated) = tokio::join!(pending_a, controller.deactivate());

    assert_eq!(
        outcome.unwrap(),
        ActivationOutcome::Cancelled { tab_id: "a".into() }
    );
    assert_eq!(deactivated, Ok(()));
    assert_eq!(recorder.log(), vec!["fetch:a"]);
    assert_eq!(recorder.renders(), 0);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.slot, SlotState::Idle);
    assert_eq!(snapshot.active, None);
    assert_eq!(snapshot.tab_state("a"), Some(TabState::Unloaded));
}

#[tokio::test]
async fn test_shutdown_during_load_cancels_it() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    let gate = Arc::new(Notify::new());
    controller.register_tab(
        "a",
        Tab::new("a", RecordingTab::new("a", recorder.clone()).gated(gate.clone())),
    );

    let pending_a = controller.activate("a", admin_session());
    wait_for_slot(&controller, SlotState::Activating("a".into())).await;

    let (outcome, ()) = tokio::join!(pending_a, controller.shutdown());

    assert_eq!(
        outcome.unwrap(),
        ActivationOutcome::Cancelled { tab_id: "a".into() }
    );
    assert_eq!(recorder.renders(), 0);
}

#[tokio::test]
async fn test_unknown_tab_keeps_current() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    controller.register_tab("a", recording_tab("a", &recorder));
    controller.activate("a", admin_session()).await.unwrap();

    let result = controller.activate("missing", admin_session()).await;
    assert_eq!(result, Err(ControllerError::UnknownTab("missing".into())));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.slot, SlotState::Active("a".into()));
    assert_eq!(snapshot.tab_state("a"), Some(TabState::Loaded));
    assert_eq!(recorder.cleanups(), 0);
}

#[tokio::test]
async fn test_reregistering_active_tab_unloads_old_instance() {
    let controller = TabController::new();
    let old_recorder = Recorder::new();
    let new_recorder = Recorder::new();
    controller.register_tab("a", recording_tab("a", &old_recorder));
    controller.activate("a", admin_session()).await.unwrap();

    controller.register_tab("a", recording_tab("a", &new_recorder));
    // Commands are handled in order; inspect waits for the registration
    let tab = controller.inspect("a").await.unwrap().unwrap();

    assert_eq!(tab.state, TabState::Unloaded);
    assert_eq!(old_recorder.cleanups(), 1);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.slot, SlotState::Idle);
    assert_eq!(snapshot.active, None);
    assert_eq!(snapshot.tabs.len(), 1);
}

#[tokio::test]
async fn test_failed_load_stays_active_and_reload_retries() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    let result = payload(Err(FetchError::Network("connection refused".into())));
    controller.register_tab(
        "a",
        Tab::new("a", RecordingTab::new("a", recorder.clone()).with_payload(result.clone())),
    );

    let outcome = controller.activate("a", admin_session()).await.unwrap();
    assert_eq!(
        outcome,
        ActivationOutcome::Failed {
            tab_id: "a".into(),
            message: "Network error: connection refused".into()
        }
    );
    assert_eq!(controller.snapshot().slot, SlotState::Active("a".into()));
    let tab = controller.inspect("a").await.unwrap().unwrap();
    assert_eq!(tab.state, TabState::Error);
    assert!(tab.html.contains("connection refused"));

    *result.lock().unwrap() = Ok("recovered".into());
    assert_eq!(controller.reload_active().await, Ok(LoadOutcome::Loaded));

    let tab = controller.inspect("a").await.unwrap().unwrap();
    assert_eq!(tab.state, TabState::Loaded);
    assert!(tab.html.contains("recovered"));
}

#[tokio::test]
async fn test_session_change_forwarded_without_reload() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    controller.register_tab("a", recording_tab("a", &recorder));
    controller.activate("a", admin_session()).await.unwrap();

    controller.on_session_change(SessionInfo::for_user("admin-2", Role::Admin));
    controller.inspect("a").await.unwrap();

    assert_eq!(recorder.session_changes(), 1);
    assert_eq!(recorder.fetches(), 1);
}

#[tokio::test]
async fn test_session_change_during_load_applied_after() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    let gate = Arc::new(Notify::new());
    controller.register_tab(
        "a",
        Tab::new("a", RecordingTab::new("a", recorder.clone()).gated(gate.clone())),
    );

    let pending = controller.activate("a", admin_session());
    wait_for_slot(&controller, SlotState::Activating("a".into())).await;
    controller.on_session_change(SessionInfo::for_user("admin-2", Role::Admin));
    gate.notify_one();

    assert!(pending.await.unwrap().is_active());
    controller.inspect("a").await.unwrap();
    assert_eq!(recorder.session_changes(), 1);
    assert_eq!(recorder.fetches(), 1);
}

#[tokio::test]
async fn test_deactivate_returns_to_idle() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    controller.register_tab("a", recording_tab("a", &recorder));
    controller.activate("a", admin_session()).await.unwrap();

    controller.deactivate().await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.slot, SlotState::Idle);
    assert_eq!(snapshot.tab_state("a"), Some(TabState::Unloaded));
    assert_eq!(recorder.cleanups(), 1);
    assert_eq!(
        controller.reload_active().await,
        Err(ControllerError::NoActiveTab)
    );
    assert_eq!(
        controller.dispatch("record-button", UiEvent::Click).await,
        Err(ControllerError::NoActiveTab)
    );
}

#[tokio::test]
async fn test_shutdown_unloads_and_rejects_commands() {
    let controller = TabController::new();
    let recorder = Recorder::new();
    controller.register_tab("a", recording_tab("a", &recorder));
    controller.activate("a", admin_session()).await.unwrap();

    controller.shutdown().await;
    assert_eq!(recorder.cleanups(), 1);

    assert_eq!(
        controller.activate("a", admin_session()).await,
        Err(ControllerError::Shutdown)
    );
    assert_eq!(controller.inspect("a").await, Err(ControllerError::Shutdown));
}
