//! Role-scoped tab groups

use std::fmt;
use std::sync::Arc;

use forte_common::Role;
use tracing::info;

use crate::api::Backend;
use crate::controller::TabController;
use crate::tab::{ManagedTab, Tab};
use crate::tabs::{
    DirectoryKind, DirectoryTab, RegistrationFormTab, RegistrationKind, ScheduleScope,
    WeeklyScheduleTab,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Admin,
    Instructor,
    Parent,
}

impl Section {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Section::Admin,
            Role::Instructor => Section::Instructor,
            Role::Parent => Section::Parent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Admin => "admin",
            Section::Instructor => "instructor",
            Section::Parent => "parent",
        }
    }

    /// Tab shown when the section opens
    pub fn default_tab(&self) -> &'static str {
        match self {
            Section::Admin => "admin-schedule",
            Section::Instructor => "instructor-schedule",
            Section::Parent => "parent-schedule",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The standard tabs of `section`, in navigation order
pub fn standard_tabs(
    section: Section,
    backend: Arc<dyn Backend>,
    page_size: usize,
) -> Vec<(String, Box<dyn ManagedTab>)> {
    let schedule = |id: &str, scope| -> (String, Box<dyn ManagedTab>) {
        (
            id.to_string(),
            Box::new(Tab::new(id, WeeklyScheduleTab::new(backend.clone(), scope))),
        )
    };
    let directory = |id: &str, kind| -> (String, Box<dyn ManagedTab>) {
        (
            id.to_string(),
            Box::new(Tab::new(id, DirectoryTab::new(backend.clone(), kind, page_size))),
        )
    };
    let registration = |id: &str, kind| -> (String, Box<dyn ManagedTab>) {
        (
            id.to_string(),
            Box::new(Tab::new(id, RegistrationFormTab::new(backend.clone(), kind))),
        )
    };

    match section {
        Section::Admin => vec![
            schedule("admin-schedule", ScheduleScope::Admin),
            directory("admin-instructors", DirectoryKind::Instructors),
            directory("admin-students", DirectoryKind::Students),
            registration("admin-private-registration", RegistrationKind::Private),
            registration("admin-group-registration", RegistrationKind::Group),
        ],
        Section::Instructor => vec![
            schedule("instructor-schedule", ScheduleScope::Instructor),
            directory("instructor-students", DirectoryKind::Students),
        ],
        Section::Parent => vec![
            schedule("parent-schedule", ScheduleScope::Parent),
            registration("parent-private-registration", RegistrationKind::Private),
            registration("parent-group-registration", RegistrationKind::Group),
        ],
    }
}

/// Register the standard tabs of `section`; returns their ids
pub fn register_section(
    controller: &TabController,
    section: Section,
    backend: Arc<dyn Backend>,
    page_size: usize,
) -> Vec<String> {
    let tabs = standard_tabs(section, backend, page_size);
    let ids: Vec<String> = tabs.iter().map(|(id, _)| id.clone()).collect();
    for (id, tab) in tabs {
        controller.register_boxed(id, tab);
    }
    info!("Registered {} tab(s) for the {} section", ids.len(), section);
    ids
}
