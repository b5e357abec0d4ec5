//! Tab controller
//!
//! Single authority for which tab is active. The controller is a cheap
//! cloneable handle around one driver task that owns the tab registry and
//! processes commands strictly in order, so no two tabs are ever loading or
//! loaded at the same time.
//!
//! # Slot state machine
//! `Idle → Activating(target) → Active(target) → Deactivating(target) → Idle`
//!
//! # Superseding activations
//! Activation requests are coalesced: a new request replaces any activation
//! still waiting in the queue (that request resolves as `Superseded`). A
//! request arriving while another tab is mid-load cancels that load's token.
//! The load winds down to `Unloaded` and the newest target is loaded next.
//! A stale target is never loaded after a newer request.
//!
//! Reloads and submits of the active tab are supervised the same way: a
//! newer activation of another tab, a deactivation or a shutdown cancels
//! them.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::{Context, Poll};

use forte_common::{EventBus, LifecycleEvent, SessionInfo, SlotState, TabState};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ControllerError, TabError};
use crate::listeners::UiEvent;
use crate::tab::{LoadOutcome, ManagedTab, UpdateAction};

/// How an activation request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Target tab is loaded and active
    Activated { tab_id: String },
    /// Target was already the loaded active tab
    AlreadyActive { tab_id: String },
    /// A newer activation replaced this one before it completed
    Superseded { tab_id: String, by: String },
    /// Load cancelled without a newer request (deactivated or shutting down)
    Cancelled { tab_id: String },
    /// Target is active but its fetch or render failed; it shows the error block
    Failed { tab_id: String, message: String },
}

impl ActivationOutcome {
    pub fn tab_id(&self) -> &str {
        match self {
            ActivationOutcome::Activated { tab_id }
            | ActivationOutcome::AlreadyActive { tab_id }
            | ActivationOutcome::Superseded { tab_id, .. }
            | ActivationOutcome::Cancelled { tab_id }
            | ActivationOutcome::Failed { tab_id, .. } => tab_id,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ActivationOutcome::Activated { .. } | ActivationOutcome::AlreadyActive { .. }
        )
    }
}

/// Point-in-time view of one registered tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSnapshot {
    pub id: String,
    pub state: TabState,
    pub html: String,
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub slot: SlotState,
    pub active: Option<String>,
    pub tabs: BTreeMap<String, TabState>,
}

impl ControllerSnapshot {
    pub fn tab_state(&self, id: &str) -> Option<TabState> {
        self.tabs.get(id).copied()
    }
}

type Reply<T> = oneshot::Sender<Result<T, ControllerError>>;

struct ActivationRequest {
    id: String,
    session: SessionInfo,
    reply: Reply<ActivationOutcome>,
}

enum Command {
    Register {
        id: String,
        tab: Box<dyn ManagedTab>,
    },
    Activate(ActivationRequest),
    Deactivate {
        reply: oneshot::Sender<()>,
    },
    SessionChanged(SessionInfo),
    ReloadActive {
        reply: Reply<LoadOutcome>,
    },
    Dispatch {
        target: String,
        event: UiEvent,
        reply: Reply<usize>,
    },
    Inspect {
        id: String,
        reply: oneshot::Sender<Option<TabSnapshot>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

enum LoadRequest {
    Load(SessionInfo),
    Reload,
}

/// Activation request in flight; resolves once the controller settles it
#[must_use = "activation outcome is only observable by awaiting"]
pub struct PendingActivation {
    tab_id: String,
    rx: oneshot::Receiver<Result<ActivationOutcome, ControllerError>>,
}

impl PendingActivation {
    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }
}

impl Future for PendingActivation {
    type Output = Result<ActivationOutcome, ControllerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(ControllerError::Shutdown)))
    }
}

/// Handle to the tab controller
///
/// Clones share the same driver task. The driver stops on [`shutdown`]
/// or once every handle is dropped, unloading the active tab either way.
///
/// [`shutdown`]: TabController::shutdown
#[derive(Clone)]
pub struct TabController {
    tx: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<ControllerSnapshot>,
    events: EventBus,
}

impl TabController {
    /// Start a controller with its own event bus
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self::with_event_bus(EventBus::default())
    }

    /// Start a controller publishing lifecycle events on `events`
    pub fn with_event_bus(events: EventBus) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(ControllerSnapshot::default());

        let driver = Driver {
            registry: HashMap::new(),
            rx,
            queue: VecDeque::new(),
            snapshot_tx,
            events: events.clone(),
            slot: SlotState::Idle,
            active: None,
            session: None,
        };
        tokio::spawn(driver.run());

        Self {
            tx,
            snapshot,
            events,
        }
    }

    /// Add a tab under `id`; an existing registration is replaced (last wins)
    pub fn register_tab(&self, id: impl Into<String>, tab: impl ManagedTab) {
        self.register_boxed(id, Box::new(tab));
    }

    pub fn register_boxed(&self, id: impl Into<String>, tab: Box<dyn ManagedTab>) {
        let id = id.into();
        if self.tx.send(Command::Register { id: id.clone(), tab }).is_err() {
            warn!("Tab controller has shut down; registration of '{}' dropped", id);
        }
    }

    /// Request activation of `id` for `session`
    ///
    /// The request is queued immediately; await the returned handle for the
    /// outcome. Requests issued back to back coalesce so only the latest one
    /// is loaded.
    pub fn activate(&self, id: impl Into<String>, session: SessionInfo) -> PendingActivation {
        let id = id.into();
        let (reply, rx) = oneshot::channel();
        let request = ActivationRequest {
            id: id.clone(),
            session,
            reply,
        };
        // On failure the reply sender is dropped and the handle resolves to Shutdown
        let _ = self.tx.send(Command::Activate(request));
        PendingActivation { tab_id: id, rx }
    }

    /// Unload the active tab and return to `Idle`
    pub async fn deactivate(&self) -> Result<(), ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Deactivate { reply })?;
        rx.await.map_err(|_| ControllerError::Shutdown)
    }

    /// Forward a refreshed session to the active tab without reloading it
    pub fn on_session_change(&self, session: SessionInfo) {
        if self.tx.send(Command::SessionChanged(session)).is_err() {
            warn!("Tab controller has shut down; session change dropped");
        }
    }

    /// Re-run fetch+render on the active tab
    pub async fn reload_active(&self) -> Result<LoadOutcome, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ReloadActive { reply })?;
        rx.await.unwrap_or(Err(ControllerError::Shutdown))
    }

    /// Deliver a UI event to the active tab
    pub async fn dispatch(
        &self,
        target: impl Into<String>,
        event: UiEvent,
    ) -> Result<usize, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Dispatch {
            target: target.into(),
            event,
            reply,
        })?;
        rx.await.unwrap_or(Err(ControllerError::Shutdown))
    }

    /// State and markup of a registered tab
    pub async fn inspect(&self, id: impl Into<String>) -> Result<Option<TabSnapshot>, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Inspect {
            id: id.into(),
            reply,
        })?;
        rx.await.map_err(|_| ControllerError::Shutdown)
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every slot or registry change
    pub fn watch(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Unload the active tab and stop the driver
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.tx.send(command).map_err(|_| ControllerError::Shutdown)
    }
}

impl Default for TabController {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver task state; owns the registry and the active-tab pointer
struct Driver {
    registry: HashMap<String, Box<dyn ManagedTab>>,
    rx: mpsc::UnboundedReceiver<Command>,
    /// Commands received but not yet handled, activations coalesced
    queue: VecDeque<Command>,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
    events: EventBus,
    slot: SlotState,
    active: Option<String>,
    /// Latest session seen by the controller
    session: Option<SessionInfo>,
}

impl Driver {
    async fn run(mut self) {
        info!("Tab controller started");

        loop {
            if self.queue.is_empty() {
                match self.rx.recv().await {
                    Some(command) => self.intake(command),
                    None => break,
                }
            }
            self.drain_channel();

            let Some(command) = self.queue.pop_front() else {
                continue;
            };
            if self.handle(command).await.is_break() {
                break;
            }
        }

        self.deactivate_current();
        info!("Tab controller stopped");
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Register { id, tab } => self.register(id, tab),
            Command::Activate(request) => self.activate(request).await,
            Command::Deactivate { reply } => {
                self.deactivate_current();
                let _ = reply.send(());
            }
            Command::SessionChanged(session) => self.propagate_session(session),
            Command::ReloadActive { reply } => {
                let result = self.reload_active().await;
                let _ = reply.send(result);
            }
            Command::Dispatch {
                target,
                event,
                reply,
            } => {
                let result = self.dispatch(&target, event).await;
                let _ = reply.send(result);
            }
            Command::Inspect { id, reply } => {
                let snapshot = self.registry.get(&id).map(|tab| TabSnapshot {
                    id: id.clone(),
                    state: tab.state(),
                    html: tab.view().html().to_string(),
                });
                let _ = reply.send(snapshot);
            }
            Command::Shutdown { reply } => {
                self.deactivate_current();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn register(&mut self, id: String, mut tab: Box<dyn ManagedTab>) {
        tab.bind_id(&id);
        tab.attach_event_bus(self.events.clone());

        match self.registry.insert(id.clone(), tab) {
            Some(mut previous) => {
                warn!("Tab '{}' was already registered; replacing it", id);
                if self.active.as_deref() == Some(id.as_str()) {
                    previous.on_unload();
                    self.active = None;
                    self.set_slot(SlotState::Idle);
                }
            }
            None => info!("Registered tab '{}'", id),
        }
        self.publish();
    }

    async fn activate(&mut self, request: ActivationRequest) {
        let ActivationRequest { id, session, reply } = request;

        let already_active = match self.registry.get(&id) {
            Some(tab) => {
                self.active.as_deref() == Some(id.as_str()) && tab.state() == TabState::Loaded
            }
            None => {
                warn!("Activation requested for unknown tab '{}'", id);
                let _ = reply.send(Err(ControllerError::UnknownTab(id)));
                return;
            }
        };

        if already_active {
            debug!("Tab '{}' is already active", id);
            if self.session.as_ref() != Some(&session) {
                self.propagate_session(session);
            }
            let _ = reply.send(Ok(ActivationOutcome::AlreadyActive { tab_id: id }));
            return;
        }

        self.session = Some(session.clone());
        self.deactivate_current();

        // A request that arrived while the previous tab was unloading wins
        self.drain_channel();
        if let Some(newer) = self.queued_activation() {
            let newer = newer.to_string();
            info!("Activation of '{}' superseded by '{}'", id, newer);
            self.events
                .emit_lossy(LifecycleEvent::activation_superseded(&id, &newer));
            let _ = reply.send(Ok(ActivationOutcome::Superseded {
                tab_id: id,
                by: newer,
            }));
            return;
        }

        let (result, superseded_by) = self.run_load(&id, LoadRequest::Load(session)).await;

        let outcome = match result {
            Ok(LoadOutcome::Loaded) | Ok(LoadOutcome::AlreadyLoaded) => {
                Ok(ActivationOutcome::Activated { tab_id: id })
            }
            Ok(LoadOutcome::Cancelled) | Ok(LoadOutcome::Skipped) => match superseded_by {
                Some(by) => {
                    self.events
                        .emit_lossy(LifecycleEvent::activation_superseded(&id, &by));
                    Ok(ActivationOutcome::Superseded { tab_id: id, by })
                }
                None => Ok(ActivationOutcome::Cancelled { tab_id: id }),
            },
            Ok(LoadOutcome::Failed { message }) => {
                Ok(ActivationOutcome::Failed { tab_id: id, message })
            }
            Err(e) => Err(ControllerError::Tab(e)),
        };
        let _ = reply.send(outcome);
    }

    /// Run a load or reload on `id`, cancelling it if a newer activation arrives
    ///
    /// Returns the load result and the id of the superseding request, if any.
    async fn run_load(
        &mut self,
        id: &str,
        request: LoadRequest,
    ) -> (Result<LoadOutcome, TabError>, Option<String>) {
        self.set_slot(SlotState::Activating(id.to_string()));

        let Driver {
            registry,
            rx,
            queue,
            events,
            ..
        } = self;
        let (result, superseded_by) = match registry.get_mut(id) {
            None => (Ok(LoadOutcome::Skipped), None),
            Some(tab) => match request {
                LoadRequest::Load(session) => {
                    let abort = tab.abort_handle();
                    supervise(rx, queue, events, id, &abort, tab.on_load(session)).await
                }
                LoadRequest::Reload => {
                    if tab.prepare_reload() {
                        // The handle must be taken after the reload arms its token
                        let abort = tab.abort_handle();
                        supervise(rx, queue, events, id, &abort, tab.run_reload()).await
                    } else {
                        (Ok(LoadOutcome::Skipped), None)
                    }
                }
            },
        };

        match self.registry.get(id).map(|tab| tab.state()) {
            Some(TabState::Loaded) | Some(TabState::Error) => {
                self.active = Some(id.to_string());
                self.set_slot(SlotState::Active(id.to_string()));
            }
            _ => {
                self.active = None;
                self.set_slot(SlotState::Idle);
            }
        }

        (result, superseded_by)
    }

    async fn run_submit(&mut self, id: &str) -> Result<UpdateAction, TabError> {
        let Driver {
            registry,
            rx,
            queue,
            events,
            ..
        } = self;
        let Some(tab) = registry.get_mut(id) else {
            return Ok(UpdateAction::Rendered);
        };

        let abort = tab.abort_handle();
        let (result, _) = supervise(rx, queue, events, id, &abort, tab.submit()).await;
        result
    }

    async fn reload_active(&mut self) -> Result<LoadOutcome, ControllerError> {
        let Some(id) = self.active.clone() else {
            return Err(ControllerError::NoActiveTab);
        };
        let (result, _) = self.run_load(&id, LoadRequest::Reload).await;
        result.map_err(ControllerError::from)
    }

    /// Route a UI event to the active tab, then run the submit or reload it
    /// asked for under supervision
    async fn dispatch(&mut self, target: &str, event: UiEvent) -> Result<usize, ControllerError> {
        let Some(id) = self.active.clone() else {
            return Err(ControllerError::NoActiveTab);
        };
        let Some(tab) = self.registry.get_mut(&id) else {
            return Err(ControllerError::UnknownTab(id));
        };

        let dispatched = tab.handle_event(target, &event);
        self.publish();
        let dispatched = dispatched?;

        let mut reload = dispatched.reload;
        if dispatched.submit {
            let submitted = self.run_submit(&id).await;
            self.publish();
            match submitted {
                Ok(UpdateAction::Reload) => reload = true,
                Ok(_) => {}
                Err(TabError::Cancelled) => {
                    debug!("Submit on '{}' cancelled", id);
                    return Ok(dispatched.handled);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if reload {
            let (result, _) = self.run_load(&id, LoadRequest::Reload).await;
            result?;
        }
        Ok(dispatched.handled)
    }

    fn propagate_session(&mut self, session: SessionInfo) {
        if let Some(id) = &self.active {
            if let Some(tab) = self.registry.get_mut(id) {
                tab.on_session_change(session.clone());
            }
        }
        self.session = Some(session);
    }

    fn deactivate_current(&mut self) {
        let Some(current) = self.active.take() else {
            return;
        };

        self.set_slot(SlotState::Deactivating(current.clone()));
        if let Some(tab) = self.registry.get_mut(&current) {
            tab.on_unload();
        }
        self.set_slot(SlotState::Idle);
    }

    fn intake(&mut self, command: Command) {
        intake(&mut self.queue, &self.events, command);
    }

    fn drain_channel(&mut self) {
        while let Ok(command) = self.rx.try_recv() {
            self.intake(command);
        }
    }

    fn queued_activation(&self) -> Option<&str> {
        self.queue.iter().find_map(|command| match command {
            Command::Activate(request) => Some(request.id.as_str()),
            _ => None,
        })
    }

    fn set_slot(&mut self, slot: SlotState) {
        if self.slot == slot {
            return;
        }
        debug!("Tab slot: {:?} -> {:?}", self.slot, slot);
        self.slot = slot.clone();
        self.events.emit_lossy(LifecycleEvent::slot_changed(slot));
        self.publish();
    }

    fn publish(&self) {
        let tabs = self
            .registry
            .iter()
            .map(|(id, tab)| (id.clone(), tab.state()))
            .collect();
        self.snapshot_tx.send_replace(ControllerSnapshot {
            slot: self.slot.clone(),
            active: self.active.clone(),
            tabs,
        });
    }
}

/// Drive `work` on tab `id` while watching the command channel
///
/// A newer activation of another tab, a deactivation, a shutdown or a closed
/// channel cancels `abort`. Every other command is queued for later. Returns
/// the work's result and the id of the superseding activation, if any.
async fn supervise<T>(
    rx: &mut mpsc::UnboundedReceiver<Command>,
    queue: &mut VecDeque<Command>,
    events: &EventBus,
    id: &str,
    abort: &CancellationToken,
    work: impl Future<Output = T>,
) -> (T, Option<String>) {
    tokio::pin!(work);

    let mut superseded_by = None;
    let mut cancelled = false;
    loop {
        tokio::select! {
            result = &mut work => return (result, superseded_by),
            command = rx.recv(), if !cancelled => match command {
                Some(Command::Activate(newer)) if newer.id != id => {
                    info!("Activation of '{}' cancels in-flight work on '{}'", newer.id, id);
                    superseded_by = Some(newer.id.clone());
                    abort.cancel();
                    cancelled = true;
                    intake(queue, events, Command::Activate(newer));
                }
                Some(command @ (Command::Deactivate { .. } | Command::Shutdown { .. })) => {
                    debug!("Unload requested; cancelling in-flight work on '{}'", id);
                    abort.cancel();
                    cancelled = true;
                    intake(queue, events, command);
                }
                Some(command) => intake(queue, events, command),
                None => {
                    debug!("All controller handles dropped; cancelling work on '{}'", id);
                    abort.cancel();
                    cancelled = true;
                }
            },
        }
    }
}

/// Queue a command, superseding any activation still waiting in the queue
fn intake(queue: &mut VecDeque<Command>, events: &EventBus, command: Command) {
    if let Command::Activate(request) = &command {
        let waiting = queue
            .iter()
            .position(|queued| matches!(queued, Command::Activate(_)));
        if let Some(Command::Activate(previous)) = waiting.and_then(|pos| queue.remove(pos)) {
            debug!(
                "Queued activation of '{}' superseded by '{}'",
                previous.id, request.id
            );
            events.emit_lossy(LifecycleEvent::activation_superseded(
                &previous.id,
                &request.id,
            ));
            let _ = previous.reply.send(Ok(ActivationOutcome::Superseded {
                tab_id: previous.id,
                by: request.id.clone(),
            }));
        }
    }
    queue.push_back(command);
}
