//! Instrumented tab content for lifecycle tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use forte_common::SessionInfo;
use forte_ui::{Container, FetchError, ListenerScope, TabContent, TabError, UpdateAction};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Counters and call log shared between a recorder tab and the test
#[derive(Default)]
pub struct Recorder {
    fetches: AtomicUsize,
    renders: AtomicUsize,
    cleanups: AtomicUsize,
    session_changes: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    pub fn session_changes(&self) -> usize {
        self.session_changes.load(Ordering::SeqCst)
    }

    /// Calls in order, e.g. `["fetch:a", "render:a", "cleanup:a"]`
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, counter: &AtomicUsize, entry: String) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(entry);
    }
}

pub type Payload = Arc<Mutex<Result<String, FetchError>>>;

pub struct RecordingTab {
    name: String,
    recorder: Arc<Recorder>,
    payload: Payload,
    gate: Option<Arc<Notify>>,
    honors_cancel: bool,
    listener: bool,
    render_error: bool,
}

impl RecordingTab {
    pub fn new(name: &str, recorder: Arc<Recorder>) -> Self {
        Self {
            name: name.to_string(),
            recorder,
            payload: Arc::new(Mutex::new(Ok(format!("{} data", name)))),
            gate: None,
            honors_cancel: true,
            listener: false,
            render_error: false,
        }
    }

    /// Share the fetch result so the test can change it between loads
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Block each fetch until `gate` is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Fetch keeps waiting on its gate after cancellation
    pub fn ignoring_cancel(mut self) -> Self {
        self.honors_cancel = false;
        self
    }

    /// Register a click listener on `record-button` without handling it
    pub fn with_listener(mut self) -> Self {
        self.listener = true;
        self
    }

    pub fn failing_render(mut self) -> Self {
        self.render_error = true;
        self
    }
}

pub fn payload(result: Result<&str, FetchError>) -> Payload {
    Arc::new(Mutex::new(result.map(str::to_string)))
}

#[async_trait]
impl TabContent for RecordingTab {
    type Data = String;
    type Message = ();

    async fn fetch_data(
        &self,
        _session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<String, TabError> {
        self.recorder
            .record(&self.recorder.fetches, format!("fetch:{}", self.name));

        if let Some(gate) = &self.gate {
            if self.honors_cancel {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(TabError::Cancelled),
                    _ = gate.notified() => {}
                }
            } else {
                gate.notified().await;
            }
        }

        self.payload.lock().unwrap().clone().map_err(TabError::from)
    }

    fn render(&mut self, data: &String, view: &mut Container) -> Result<(), TabError> {
        self.recorder
            .record(&self.recorder.renders, format!("render:{}", self.name));
        if self.render_error {
            return Err(TabError::render(format!("cannot draw {}", self.name)));
        }
        view.set_html(format!(r#"<p class="recorded">{}</p>"#, data));
        Ok(())
    }

    fn attach_event_listeners(&mut self, listeners: &mut ListenerScope<()>) {
        if self.listener {
            listeners.on_click("record-button", ());
        }
    }

    fn session_changed(&mut self, _session: &SessionInfo) {
        self.recorder.session_changes.fetch_add(1, Ordering::SeqCst);
    }

    fn cleanup(&mut self) {
        self.recorder
            .record(&self.recorder.cleanups, format!("cleanup:{}", self.name));
    }
}

/// Recording tab whose `record-button` click asks for a reload
pub struct ReloadOnClick(pub RecordingTab);

#[async_trait]
impl TabContent for ReloadOnClick {
    type Data = String;
    type Message = ();

    async fn fetch_data(
        &self,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<String, TabError> {
        self.0.fetch_data(session, cancel).await
    }

    fn render(&mut self, data: &String, view: &mut Container) -> Result<(), TabError> {
        self.0.render(data, view)
    }

    fn attach_event_listeners(&mut self, listeners: &mut ListenerScope<()>) {
        listeners.on_click("record-button", ());
    }

    fn update(
        &mut self,
        _message: (),
        _data: &String,
        _view: &mut Container,
    ) -> Result<UpdateAction, TabError> {
        Ok(UpdateAction::Reload)
    }

    fn cleanup(&mut self) {
        self.0.cleanup()
    }
}
