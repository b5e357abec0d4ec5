//! Lifecycle event types and broadcast bus
//!
//! Tabs and the tab controller publish every state transition here. The
//! navigation shell (or a test) subscribes to follow what the UI is doing
//! without reaching into tab internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Lifecycle state of one tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TabState {
    /// Registered, nothing fetched (initial state and after unload/cancel)
    #[default]
    Unloaded,
    /// Fetch in flight
    Loading,
    /// Rendered and listening for UI events
    Loaded,
    /// Fetch or render failed; error block shown
    Error,
}

impl TabState {
    /// Loading or Loaded: the tab owns its container
    pub fn is_live(&self) -> bool {
        matches!(self, TabState::Loading | TabState::Loaded)
    }
}

impl fmt::Display for TabState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TabState::Unloaded => "unloaded",
            TabState::Loading => "loading",
            TabState::Loaded => "loaded",
            TabState::Error => "error",
        };
        f.write_str(name)
    }
}

/// State of the controller's single active-tab slot
///
/// `Idle → Activating → Active → Deactivating → Idle`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "slot", content = "tab_id")]
pub enum SlotState {
    #[default]
    Idle,
    Activating(String),
    Active(String),
    Deactivating(String),
}

impl SlotState {
    /// Tab the slot currently refers to, if any
    pub fn tab_id(&self) -> Option<&str> {
        match self {
            SlotState::Idle => None,
            SlotState::Activating(id) | SlotState::Active(id) | SlotState::Deactivating(id) => {
                Some(id)
            }
        }
    }

    /// Activating or Deactivating
    pub fn in_transition(&self) -> bool {
        matches!(self, SlotState::Activating(_) | SlotState::Deactivating(_))
    }
}

/// Lifecycle event broadcast on the [`EventBus`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// A tab moved between lifecycle states
    TabStateChanged {
        tab_id: String,
        old_state: TabState,
        new_state: TabState,
        timestamp: DateTime<Utc>,
    },

    /// The controller's active slot changed
    SlotChanged {
        slot: SlotState,
        timestamp: DateTime<Utc>,
    },

    /// Fetch or render failed; the tab shows the error block
    TabLoadFailed {
        tab_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A queued or in-flight activation was replaced by a newer request
    ActivationSuperseded {
        requested: String,
        superseded_by: String,
        timestamp: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    pub fn tab_state_changed(tab_id: &str, old_state: TabState, new_state: TabState) -> Self {
        LifecycleEvent::TabStateChanged {
            tab_id: tab_id.to_string(),
            old_state,
            new_state,
            timestamp: Utc::now(),
        }
    }

    pub fn slot_changed(slot: SlotState) -> Self {
        LifecycleEvent::SlotChanged {
            slot,
            timestamp: Utc::now(),
        }
    }

    pub fn tab_load_failed(tab_id: &str, message: impl Into<String>) -> Self {
        LifecycleEvent::TabLoadFailed {
            tab_id: tab_id.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn activation_superseded(requested: &str, superseded_by: &str) -> Self {
        LifecycleEvent::ActivationSuperseded {
            requested: requested.to_string(),
            superseded_by: superseded_by.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast bus for [`LifecycleEvent`]s
///
/// Cloning the bus yields another sender on the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    ///
    /// ```
    /// use forte_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LifecycleEvent,
    ) -> Result<usize, broadcast::error::SendError<LifecycleEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LifecycleEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
