//! UI components rendered inside tab containers
//!
//! The component set is closed: [`Component`] enumerates every kind a tab may
//! embed, and each kind implements [`Render`].

mod autocomplete;
mod select;
mod table;

pub use autocomplete::{AutocompleteComponent, AutocompleteItem};
pub use select::{SelectComponent, SelectOption};
pub use table::{Column, TableComponent};

use thiserror::Error;

/// Component input rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentError {
    #[error("Unknown option '{0}'")]
    UnknownOption(String),

    #[error("Option '{0}' is disabled")]
    DisabledOption(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Column '{0}' is not sortable")]
    NotSortable(String),
}

/// Markup producer
pub trait Render {
    /// Append this component's markup to `out`
    fn render(&self, out: &mut String);

    fn to_html(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

/// Sort direction of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    /// `aria-sort` attribute value
    pub fn aria(self) -> &'static str {
        match self {
            SortOrder::Asc => "ascending",
            SortOrder::Desc => "descending",
        }
    }
}

/// Every component kind a tab can embed
#[derive(Debug, Clone)]
pub enum Component {
    Table(TableComponent),
    Select(SelectComponent),
    Autocomplete(AutocompleteComponent),
}

impl Component {
    pub fn id(&self) -> &str {
        match self {
            Component::Table(c) => c.id(),
            Component::Select(c) => c.id(),
            Component::Autocomplete(c) => c.id(),
        }
    }

    pub fn as_table(&self) -> Option<&TableComponent> {
        match self {
            Component::Table(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut TableComponent> {
        match self {
            Component::Table(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&SelectComponent> {
        match self {
            Component::Select(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut SelectComponent> {
        match self {
            Component::Select(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_autocomplete(&self) -> Option<&AutocompleteComponent> {
        match self {
            Component::Autocomplete(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_autocomplete_mut(&mut self) -> Option<&mut AutocompleteComponent> {
        match self {
            Component::Autocomplete(c) => Some(c),
            _ => None,
        }
    }
}

impl Render for Component {
    fn render(&self, out: &mut String) {
        match self {
            Component::Table(c) => c.render(out),
            Component::Select(c) => c.render(out),
            Component::Autocomplete(c) => c.render(out),
        }
    }
}

impl From<TableComponent> for Component {
    fn from(c: TableComponent) -> Self {
        Component::Table(c)
    }
}

impl From<SelectComponent> for Component {
    fn from(c: SelectComponent) -> Self {
        Component::Select(c)
    }
}

impl From<AutocompleteComponent> for Component {
    fn from(c: AutocompleteComponent) -> Self {
        Component::Autocomplete(c)
    }
}
