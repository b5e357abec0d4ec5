//! # Forte Common Library
//!
//! Shared code for the Forte/Tonic lesson scheduling UI including:
//! - Error types
//! - Configuration loading (TOML bootstrap, env and CLI overrides)
//! - Session context passed into tabs at load time
//! - Lifecycle event types and the broadcast `EventBus`

pub mod config;
pub mod error;
pub mod events;
pub mod session;

pub use error::{Error, Result};
pub use events::{EventBus, LifecycleEvent, SlotState, TabState};
pub use session::{Role, SessionInfo};
