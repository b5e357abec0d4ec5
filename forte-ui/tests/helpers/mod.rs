//! Test Helper Utilities
//!
//! Shared utilities for testing forte-ui

#![allow(dead_code)]

pub mod backend;
pub mod recorder;

pub use backend::ScriptedBackend;
pub use recorder::{Recorder, RecordingTab, ReloadOnClick};

use forte_common::{Role, SessionInfo};

pub fn admin_session() -> SessionInfo {
    SessionInfo::for_user("admin-1", Role::Admin).with_display_name("Office")
}

pub fn parent_session() -> SessionInfo {
    SessionInfo::for_user("p1", Role::Parent).with_access_code("tonic-123")
}
