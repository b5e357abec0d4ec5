//! Tracked UI event listeners
//!
//! Tabs register listeners through a [`ListenerScope`] created for each load
//! cycle. The scope maps UI events on a target (an element id or
//! `data-action` name) to tab messages. The tab owns the scope and drops it
//! exactly once on unload or reload, which detaches every listener it holds.

use std::fmt;
use tracing::debug;

/// Kind of UI event a listener reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Input,
    Change,
    Submit,
}

/// UI event delivered by the navigation shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Click,
    /// Text typed into an input
    Input(String),
    /// Value picked in a select
    Change(String),
    Submit,
}

impl UiEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            UiEvent::Click => EventKind::Click,
            UiEvent::Input(_) => EventKind::Input,
            UiEvent::Change(_) => EventKind::Change,
            UiEvent::Submit => EventKind::Submit,
        }
    }

    /// Text carried by input/change events
    pub fn value(&self) -> Option<&str> {
        match self {
            UiEvent::Input(value) | UiEvent::Change(value) => Some(value),
            UiEvent::Click | UiEvent::Submit => None,
        }
    }
}

type Handler<M> = Box<dyn Fn(&UiEvent) -> Option<M> + Send + Sync>;

struct Listener<M> {
    target: String,
    kind: EventKind,
    handler: Handler<M>,
}

/// Listeners registered during one load cycle of one tab
pub struct ListenerScope<M> {
    tab_id: String,
    listeners: Vec<Listener<M>>,
}

impl<M> ListenerScope<M> {
    pub(crate) fn new(tab_id: &str) -> Self {
        Self {
            tab_id: tab_id.to_string(),
            listeners: Vec::new(),
        }
    }

    /// Register a listener mapping `kind` events on `target` to a message
    ///
    /// The handler may return `None` to ignore an event.
    pub fn on<F>(&mut self, target: impl Into<String>, kind: EventKind, handler: F)
    where
        F: Fn(&UiEvent) -> Option<M> + Send + Sync + 'static,
    {
        self.listeners.push(Listener {
            target: target.into(),
            kind,
            handler: Box::new(handler),
        });
    }

    /// Register a click listener that always produces `message`
    pub fn on_click(&mut self, target: impl Into<String>, message: M)
    where
        M: Clone + Send + Sync + 'static,
    {
        self.on(target, EventKind::Click, move |_| Some(message.clone()));
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Messages produced by every listener matching `target` and the event kind
    pub(crate) fn messages_for(&self, target: &str, event: &UiEvent) -> Vec<M> {
        let kind = event.kind();
        self.listeners
            .iter()
            .filter(|l| l.kind == kind && l.target == target)
            .filter_map(|l| (l.handler)(event))
            .collect()
    }
}

impl<M> fmt::Debug for ListenerScope<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerScope")
            .field("tab_id", &self.tab_id)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<M> Drop for ListenerScope<M> {
    fn drop(&mut self) {
        if !self.listeners.is_empty() {
            debug!(
                "Detached {} listener(s) from tab '{}'",
                self.listeners.len(),
                self.tab_id
            );
        }
    }
}
