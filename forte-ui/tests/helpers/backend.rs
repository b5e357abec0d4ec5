//! In-memory backend with per-path responses

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use forte_common::SessionInfo;
use forte_ui::{Backend, FetchError, TabError};
use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<HashMap<String, Result<Value, FetchError>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Value)>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), Ok(body));
    }

    pub fn fail(&self, path: &str, error: FetchError) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), Err(error));
    }

    /// Hold requests to `path` until the returned gate is notified
    pub fn gate(&self, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(path.to_string(), gate.clone());
        gate
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }

    async fn answer(&self, path: &str, cancel: &CancellationToken) -> Result<Value, TabError> {
        self.requests.lock().unwrap().push(path.to_string());

        let gate = self.gates.lock().unwrap().get(path).cloned();
        if let Some(gate) = gate {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TabError::Cancelled),
                _ = gate.notified() => {}
            }
        }

        let response = self.responses.lock().unwrap().get(path).cloned();
        match response {
            Some(result) => result.map_err(TabError::from),
            None => Err(FetchError::Status {
                status: 404,
                message: format!("no route for {}", path),
            }
            .into()),
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn get_json(
        &self,
        path: &str,
        _session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<Value, TabError> {
        self.answer(path, cancel).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: &Value,
        _session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<Value, TabError> {
        self.posts
            .lock()
            .unwrap()
            .push((path.to_string(), body.clone()));
        self.answer(path, cancel).await
    }
}
