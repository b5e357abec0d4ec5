//! Session context handed to tabs at load time
//!
//! The session is owned by the tab controller. Tabs receive clones and never
//! mutate them; refreshed role/auth data reaches the active tab only through
//! an explicit session-change call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Role of the signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::Parent => "parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            "parent" => Ok(Role::Parent),
            other => Err(Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Read-only snapshot of the caller's authentication context
///
/// Every field is optional: tabs may be loaded before authentication
/// completes, in which case only public data can be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Backend identifier of the user (parent, instructor or admin id)
    #[serde(default)]
    pub user_id: Option<String>,

    /// Name shown in panel headings
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub role: Option<Role>,

    /// Access code issued by the backend, sent as a bearer token
    #[serde(default)]
    pub access_code: Option<String>,

    #[serde(default)]
    pub authenticated_at: Option<DateTime<Utc>>,
}

impl SessionInfo {
    /// Session with no user attached (before authentication)
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated session for a user in the given role
    pub fn for_user(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: Some(user_id.into()),
            display_name: None,
            role: Some(role),
            access_code: None,
            authenticated_at: Some(Utc::now()),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_access_code(mut self, code: impl Into<String>) -> Self {
        self.access_code = Some(code.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some() && self.role.is_some()
    }

    /// Name for headings: display name, then user id, then "Guest"
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.user_id.as_deref())
            .unwrap_or("Guest")
    }
}
