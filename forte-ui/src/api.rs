//! Backend access
//!
//! Tabs fetch through the [`Backend`] trait so tests can script responses.
//! [`ApiClient`] is the HTTP implementation talking to the `/api/...` server.

use std::time::Duration;

use async_trait::async_trait;
use forte_common::config::UiConfig;
use forte_common::SessionInfo;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{FetchError, TabError};

const USER_AGENT: &str = concat!("forte-ui/", env!("CARGO_PKG_VERSION"));

/// JSON backend used by tabs
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn get_json(
        &self,
        path: &str,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<Value, TabError>;

    async fn post_json(
        &self,
        path: &str,
        body: &Value,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<Value, TabError>;
}

/// GET `path` and decode the body into `T`
pub async fn fetch_as<T: DeserializeOwned>(
    backend: &dyn Backend,
    path: &str,
    session: &SessionInfo,
    cancel: &CancellationToken,
) -> Result<T, TabError> {
    let value = backend.get_json(path, session, cancel).await?;
    serde_json::from_value(value)
        .map_err(|e| FetchError::Decode(format!("{}: {}", path, e)).into())
}

/// HTTP client for the REST backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &UiConfig) -> Result<Self, FetchError> {
        Self::new(config.api_base_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        session: &SessionInfo,
    ) -> reqwest::RequestBuilder {
        match &session.access_code {
            Some(code) => request.bearer_auth(code),
            None => request,
        }
    }

    async fn execute(
        &self,
        method: &str,
        path: &str,
        request: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Value, TabError> {
        debug!("{} {}", method, path);

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = error_message(&body).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
                warn!("{} {} failed with {}: {}", method, path, status, message);
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("{} {} cancelled", method, path);
                Err(TabError::Cancelled)
            }
            result = exchange => result.map_err(TabError::from),
        }
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn get_json(
        &self,
        path: &str,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<Value, TabError> {
        let request = self.authorize(self.http_client.get(self.url(path)), session);
        self.execute("GET", path, request, cancel).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: &Value,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<Value, TabError> {
        let request = self.authorize(self.http_client.post(self.url(path)).json(body), session);
        self.execute("POST", path, request, cancel).await
    }
}

/// Message from an `{"error": "..."}` or `{"error": {"message": "..."}}` body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(details) => details
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
