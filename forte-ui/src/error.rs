//! Error types for forte-ui
//!
//! Fetch and render failures end in the tab's error block. Cancellation is
//! swallowed by the lifecycle. Contract violations are returned to the caller
//! immediately.

use thiserror::Error;

/// Backend request failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Tab needs a signed-in user and the session has none
    #[error("Not signed in")]
    Unauthenticated,
}

/// Failure inside a tab's lifecycle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TabError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Load cycle cancelled by unload or a superseding activation
    #[error("Load cancelled")]
    Cancelled,

    /// `render` could not produce markup from the fetched data
    #[error("Render error: {0}")]
    Render(String),

    /// Tab implementation broke the lifecycle contract
    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

impl TabError {
    pub fn render(message: impl Into<String>) -> Self {
        TabError::Render(message.into())
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, TabError::Cancelled)
    }

    /// Shown in the error block (fetch and render failures)
    pub fn is_user_visible(&self) -> bool {
        matches!(self, TabError::Fetch(_) | TabError::Render(_))
    }
}

/// Tab controller errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("No tab registered with id '{0}'")]
    UnknownTab(String),

    #[error("No tab is active")]
    NoActiveTab,

    /// Driver task stopped; the controller accepts no more commands
    #[error("Tab controller has shut down")]
    Shutdown,

    #[error(transparent)]
    Tab(#[from] TabError),
}
