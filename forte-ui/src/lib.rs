//! forte-ui: tab lifecycle core of the Forte lesson scheduling UI
//!
//! Panels ("tabs") load their data from the REST backend, render into a
//! container, and attach listeners. The [`TabController`] keeps exactly one
//! of them active at a time.

pub mod api;
pub mod components;
pub mod controller;
pub mod error;
pub mod listeners;
pub mod models;
pub mod pagination;
pub mod sections;
pub mod tab;
pub mod tabs;
pub mod view;

pub use api::{ApiClient, Backend};
pub use controller::{ActivationOutcome, ControllerSnapshot, TabController, TabSnapshot};
pub use error::{ControllerError, FetchError, TabError};
pub use listeners::{EventKind, ListenerScope, UiEvent};
pub use sections::{register_section, standard_tabs, Section};
pub use tab::{Dispatched, LoadOutcome, ManagedTab, Tab, TabContent, UpdateAction};
pub use view::Container;
