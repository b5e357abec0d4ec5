//! Tab lifecycle
//!
//! A tab is one independently loadable panel. Its lifecycle is
//! `Unloaded → Loading → Loaded`, with `Loaded → Unloaded` on deactivation and
//! `Loading/Loaded → Error` when a fetch or render fails.
//!
//! Panel-specific behavior lives in a [`TabContent`] implementation. The
//! generic [`Tab`] wrapper runs the lifecycle around it:
//!
//! 1. `fetch_data` under the cycle's cancellation token (the only suspension point)
//! 2. `render` into a staged container, swapped in only on success
//! 3. `attach_event_listeners` into a fresh [`ListenerScope`]
//!
//! Fetch and render failures are caught here, logged, and shown as the
//! generic error block. A cancelled cycle returns the tab to `Unloaded`
//! without touching the error path.

use async_trait::async_trait;
use forte_common::{EventBus, LifecycleEvent, SessionInfo, TabState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::TabError;
use crate::listeners::{ListenerScope, UiEvent};
use crate::view::Container;

/// Result of handling a listener message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    /// Container was updated in place
    Rendered,
    /// Data is stale; run a full fetch+render cycle
    Reload,
    /// Send the tab's pending input to the backend via [`TabContent::submit`]
    Submit,
}

/// Result of routing one UI event through a tab's listeners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatched {
    /// Listener messages handled
    pub handled: usize,
    /// An update asked for a full fetch+render cycle
    pub reload: bool,
    /// An update asked for a submit
    pub submit: bool,
}

/// How a load or reload request ended
///
/// Fetch and render failures are reported here rather than as `Err`, because
/// the lifecycle has already handled them by showing the error block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Tab was already loaded; request ignored
    AlreadyLoaded,
    /// Cycle cancelled; tab is back to `Unloaded`
    Cancelled,
    /// Fetch or render failed; tab is in `Error`
    Failed { message: String },
    /// Nothing to reload (tab never loaded)
    Skipped,
}

/// Panel-specific half of a tab
///
/// `fetch_data` and `render` are required. The remaining hooks default to
/// no-ops, except `update`, which must be overridden by any tab that
/// registers listeners.
#[async_trait]
pub trait TabContent: Send + Sync + 'static {
    /// Payload produced by `fetch_data` and owned by the tab while loaded
    type Data: Send + Sync + 'static;

    /// Message produced by this tab's listeners
    type Message: Send + 'static;

    /// Fetch the panel's data
    ///
    /// Long-running fetches must observe `cancel` and return
    /// [`TabError::Cancelled`] promptly once it fires.
    async fn fetch_data(
        &self,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<Self::Data, TabError>;

    /// Render `data` into `view`
    ///
    /// Must be synchronous and idempotent: the same data always produces the
    /// same markup.
    fn render(&mut self, data: &Self::Data, view: &mut Container) -> Result<(), TabError>;

    fn attach_event_listeners(&mut self, _listeners: &mut ListenerScope<Self::Message>) {}

    /// Handle a message produced by one of this tab's listeners
    fn update(
        &mut self,
        _message: Self::Message,
        _data: &Self::Data,
        _view: &mut Container,
    ) -> Result<UpdateAction, TabError> {
        Err(TabError::ContractViolation(
            "tab registered listeners but does not override update()".to_string(),
        ))
    }

    /// Send pending input to the backend
    ///
    /// Runs after `update` returns [`UpdateAction::Submit`], under the
    /// current cycle's token. The returned message is fed back through
    /// `update`, so backend rejections belong in the message rather than in
    /// `Err`.
    async fn submit(
        &self,
        _session: &SessionInfo,
        _cancel: &CancellationToken,
    ) -> Result<Self::Message, TabError> {
        Err(TabError::ContractViolation(
            "tab asked for a submit but does not override submit()".to_string(),
        ))
    }

    /// Session refreshed while the tab is live
    fn session_changed(&mut self, _session: &SessionInfo) {}

    /// Release tab-specific resources on unload (cached component handles etc.)
    fn cleanup(&mut self) {}
}

/// A panel and its lifecycle state
pub struct Tab<C: TabContent> {
    id: String,
    content: C,
    state: TabState,
    data: Option<C::Data>,
    session: Option<SessionInfo>,
    view: Container,
    listeners: Option<ListenerScope<C::Message>>,
    /// Token of the current (or next) load cycle
    cycle: CancellationToken,
    events: Option<EventBus>,
    completed_loads: u64,
}

impl<C: TabContent> Tab<C> {
    pub fn new(id: impl Into<String>, content: C) -> Self {
        let id = id.into();
        Self {
            view: Container::new(id.clone()),
            id,
            content,
            state: TabState::Unloaded,
            data: None,
            session: None,
            listeners: None,
            cycle: CancellationToken::new(),
            events: None,
            completed_loads: 0,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TabState {
        self.state
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn data(&self) -> Option<&C::Data> {
        self.data.as_ref()
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn view(&self) -> &Container {
        &self.view
    }

    pub fn html(&self) -> &str {
        self.view.html()
    }

    /// Listeners attached by the current cycle
    pub fn listener_count(&self) -> usize {
        self.listeners.as_ref().map_or(0, ListenerScope::len)
    }

    /// Number of cycles that reached `Loaded`
    pub fn completed_loads(&self) -> u64 {
        self.completed_loads
    }

    /// Token that cancels the current (or next) load cycle
    ///
    /// Holders use this to abort a load that is in flight while the tab
    /// itself is mutably borrowed by `on_load`/`reload`.
    pub fn abort_handle(&self) -> CancellationToken {
        self.cycle.clone()
    }

    /// Load the tab for `session`
    ///
    /// Ignored with a warning while loaded. Also accepted from `Error`, which
    /// is the fresh-load recovery path.
    pub async fn on_load(&mut self, session: SessionInfo) -> Result<LoadOutcome, TabError> {
        if self.state.is_live() {
            warn!("Tab '{}' is already {}; ignoring load request", self.id, self.state);
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        self.session = Some(session);
        self.run_cycle().await
    }

    /// Cancel the tab's cycle and release everything it holds
    ///
    /// No-op unless the tab is loading or loaded.
    pub fn on_unload(&mut self) {
        if !self.state.is_live() {
            debug!("Tab '{}' is {}; nothing to unload", self.id, self.state);
            return;
        }

        self.rearm();
        self.listeners = None;
        self.release();
        self.session = None;
        self.view.clear();
        self.transition(TabState::Unloaded);
        info!("Unloaded tab '{}'", self.id);
    }

    /// Re-run fetch+render with the stored session
    ///
    /// Cancels the previous cycle first. Skipped if the tab holds no session
    /// (never loaded, or unloaded since).
    pub async fn reload(&mut self) -> Result<LoadOutcome, TabError> {
        if !self.prepare_reload() {
            return Ok(LoadOutcome::Skipped);
        }
        self.run_reload().await
    }

    /// First half of [`Tab::reload`]: cancel the previous cycle and arm the
    /// token the reload will run under
    ///
    /// Returns false when there is no session to reload with. Between this
    /// and [`Tab::run_reload`], [`Tab::abort_handle`] cancels the reload.
    pub fn prepare_reload(&mut self) -> bool {
        if self.session.is_none() {
            warn!("Tab '{}' has no session to reload with", self.id);
            return false;
        }

        self.rearm();
        self.listeners = None;
        true
    }

    /// Second half of [`Tab::reload`]
    pub async fn run_reload(&mut self) -> Result<LoadOutcome, TabError> {
        self.run_cycle().await
    }

    /// Replace the stored session without refetching
    pub fn on_session_change(&mut self, session: SessionInfo) {
        if !self.state.is_live() {
            debug!("Tab '{}' is {}; session change ignored", self.id, self.state);
            return;
        }

        self.content.session_changed(&session);
        self.session = Some(session);
        debug!("Session updated for tab '{}'", self.id);
    }

    /// Route a UI event through the tab's listeners
    ///
    /// Returns the number of messages handled. Follow-up work asked for by
    /// `update` runs after all messages are handled: a submit first, then at
    /// most one reload.
    pub async fn dispatch(&mut self, target: &str, event: UiEvent) -> Result<usize, TabError> {
        let dispatched = self.handle_event(target, &event)?;

        let mut reload = dispatched.reload;
        if dispatched.submit {
            match self.submit().await {
                Ok(UpdateAction::Reload) => reload = true,
                Ok(_) => {}
                Err(e) if e.is_cancellation() => {
                    debug!("Submit on tab '{}' cancelled", self.id);
                    return Ok(dispatched.handled);
                }
                Err(e) => return Err(e),
            }
        }

        if reload {
            self.reload().await?;
        }
        Ok(dispatched.handled)
    }

    /// Synchronous half of [`Tab::dispatch`]: run `update` for every
    /// matching listener and report the follow-up work requested
    pub fn handle_event(&mut self, target: &str, event: &UiEvent) -> Result<Dispatched, TabError> {
        let Some(scope) = &self.listeners else {
            debug!("Tab '{}' has no listeners; dropping {:?} on '{}'", self.id, event, target);
            return Ok(Dispatched::default());
        };

        let messages = scope.messages_for(target, event);
        if messages.is_empty() {
            debug!("No listener on '{}' for {:?} in tab '{}'", target, event, self.id);
            return Ok(Dispatched::default());
        }

        let mut dispatched = Dispatched {
            handled: messages.len(),
            ..Dispatched::default()
        };
        for message in messages {
            let Some(data) = self.data.as_ref() else {
                break;
            };
            match self.content.update(message, data, &mut self.view) {
                Ok(UpdateAction::Rendered) => {}
                Ok(UpdateAction::Reload) => dispatched.reload = true,
                Ok(UpdateAction::Submit) => dispatched.submit = true,
                Err(e) => {
                    self.fail(e)?;
                    return Ok(Dispatched {
                        handled: dispatched.handled,
                        ..Dispatched::default()
                    });
                }
            }
        }
        Ok(dispatched)
    }

    /// Run the tab's submit and feed its result back through `update`
    ///
    /// Runs under the current cycle's token; a cancelled submit returns
    /// [`TabError::Cancelled`] and leaves the tab as it was.
    pub async fn submit(&mut self) -> Result<UpdateAction, TabError> {
        let Some(session) = self.session.clone().filter(|_| self.data.is_some()) else {
            return Err(TabError::ContractViolation(format!(
                "tab '{}' asked for a submit while not loaded",
                self.id
            )));
        };
        let token = self.cycle.clone();

        let submitted = tokio::select! {
            biased;
            _ = token.cancelled() => Err(TabError::Cancelled),
            result = self.content.submit(&session, &token) => result,
        };
        let message = match submitted {
            Ok(_) if token.is_cancelled() => return Err(TabError::Cancelled),
            Err(e) if e.is_cancellation() => return Err(e),
            Ok(message) => message,
            Err(e) => return self.fail(e).map(|_| UpdateAction::Rendered),
        };

        let Some(data) = self.data.as_ref() else {
            return Ok(UpdateAction::Rendered);
        };
        match self.content.update(message, data, &mut self.view) {
            Ok(UpdateAction::Submit) => self
                .fail(TabError::ContractViolation(
                    "update asked for another submit while handling a submit result".to_string(),
                ))
                .map(|_| UpdateAction::Rendered),
            Ok(action) => Ok(action),
            Err(e) => self.fail(e).map(|_| UpdateAction::Rendered),
        }
    }

    pub(crate) fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
        self.view.set_id(id);
    }

    pub(crate) fn set_event_bus(&mut self, bus: EventBus) {
        self.events = Some(bus);
    }

    async fn run_cycle(&mut self) -> Result<LoadOutcome, TabError> {
        let Some(session) = self.session.clone() else {
            return Err(TabError::ContractViolation(format!(
                "tab '{}' started a load cycle without a session",
                self.id
            )));
        };
        let token = self.cycle.clone();
        let cycle_id = Uuid::new_v4();

        debug!("Tab '{}' starting load cycle {}", self.id, cycle_id);
        self.transition(TabState::Loading);
        self.view.show_loading();

        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => Err(TabError::Cancelled),
            result = self.content.fetch_data(&session, &token) => result,
        };

        // A fetch that resolved after cancellation must not reach render
        let data = match fetched {
            Ok(_) if token.is_cancelled() => return Ok(self.finish_cancelled(cycle_id)),
            Err(e) if e.is_cancellation() && token.is_cancelled() => {
                return Ok(self.finish_cancelled(cycle_id))
            }
            Ok(data) => data,
            Err(e) => return self.fail(e),
        };

        let mut staged = Container::new(self.view.id());
        if let Err(e) = self.content.render(&data, &mut staged) {
            return self.fail(e);
        }
        self.view.replace_with(staged);

        let mut scope = ListenerScope::new(&self.id);
        self.content.attach_event_listeners(&mut scope);
        self.listeners = Some(scope);
        self.data = Some(data);
        self.completed_loads += 1;
        self.transition(TabState::Loaded);

        info!("Loaded tab '{}' (cycle {})", self.id, cycle_id);
        Ok(LoadOutcome::Loaded)
    }

    fn finish_cancelled(&mut self, cycle_id: Uuid) -> LoadOutcome {
        debug!("Tab '{}' load cycle {} cancelled", self.id, cycle_id);
        self.listeners = None;
        self.release();
        self.session = None;
        self.view.clear();
        self.cycle = CancellationToken::new();
        self.transition(TabState::Unloaded);
        LoadOutcome::Cancelled
    }

    fn fail(&mut self, err: TabError) -> Result<LoadOutcome, TabError> {
        let message = err.to_string();
        error!("Tab '{}' failed: {}", self.id, message);

        self.listeners = None;
        self.release();
        self.view.show_error(&message);
        self.transition(TabState::Error);
        if let Some(bus) = &self.events {
            bus.emit_lossy(LifecycleEvent::tab_load_failed(&self.id, message.clone()));
        }

        match err {
            TabError::ContractViolation(_) => Err(err),
            _ => Ok(LoadOutcome::Failed { message }),
        }
    }

    /// Drop the rendered data, running `cleanup` if a render was held
    ///
    /// A reload that is cancelled or fails still holds the previous render,
    /// so it is released here rather than leaked into `Unloaded`/`Error`.
    fn release(&mut self) {
        if self.data.take().is_some() {
            self.content.cleanup();
        }
    }

    /// Cancel the current cycle token and arm a fresh one
    fn rearm(&mut self) {
        self.cycle.cancel();
        self.cycle = CancellationToken::new();
    }

    fn transition(&mut self, new_state: TabState) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }
        self.state = new_state;
        debug!("Tab '{}': {} -> {}", self.id, old_state, new_state);

        if let Some(bus) = &self.events {
            bus.emit_lossy(LifecycleEvent::tab_state_changed(&self.id, old_state, new_state));
        }
    }
}

/// Object-safe view of a [`Tab`] used by the controller's registry
#[async_trait]
pub trait ManagedTab: Send + 'static {
    fn id(&self) -> &str;

    /// Rebind the tab (and its container) to a registry id
    fn bind_id(&mut self, id: &str);

    fn state(&self) -> TabState;

    fn view(&self) -> &Container;

    fn abort_handle(&self) -> CancellationToken;

    fn attach_event_bus(&mut self, bus: EventBus);

    async fn on_load(&mut self, session: SessionInfo) -> Result<LoadOutcome, TabError>;

    fn on_unload(&mut self);

    /// See [`Tab::prepare_reload`]; take `abort_handle` after this
    fn prepare_reload(&mut self) -> bool;

    async fn run_reload(&mut self) -> Result<LoadOutcome, TabError>;

    fn on_session_change(&mut self, session: SessionInfo);

    fn handle_event(&mut self, target: &str, event: &UiEvent) -> Result<Dispatched, TabError>;

    async fn submit(&mut self) -> Result<UpdateAction, TabError>;
}

#[async_trait]
impl<C: TabContent> ManagedTab for Tab<C> {
    fn id(&self) -> &str {
        &self.id
    }

    fn bind_id(&mut self, id: &str) {
        self.set_id(id);
    }

    fn state(&self) -> TabState {
        self.state
    }

    fn view(&self) -> &Container {
        &self.view
    }

    fn abort_handle(&self) -> CancellationToken {
        Tab::abort_handle(self)
    }

    fn attach_event_bus(&mut self, bus: EventBus) {
        self.set_event_bus(bus);
    }

    async fn on_load(&mut self, session: SessionInfo) -> Result<LoadOutcome, TabError> {
        Tab::on_load(self, session).await
    }

    fn on_unload(&mut self) {
        Tab::on_unload(self)
    }

    fn prepare_reload(&mut self) -> bool {
        Tab::prepare_reload(self)
    }

    async fn run_reload(&mut self) -> Result<LoadOutcome, TabError> {
        Tab::run_reload(self).await
    }

    fn on_session_change(&mut self, session: SessionInfo) {
        Tab::on_session_change(self, session)
    }

    fn handle_event(&mut self, target: &str, event: &UiEvent) -> Result<Dispatched, TabError> {
        Tab::handle_event(self, target, event)
    }

    async fn submit(&mut self) -> Result<UpdateAction, TabError> {
        Tab::submit(self).await
    }
}
