//! Directory tabs: instructor and student tables

use std::sync::Arc;

use async_trait::async_trait;
use forte_common::SessionInfo;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{fetch_as, Backend};
use crate::components::{Column, Component, Render, TableComponent};
use crate::error::TabError;
use crate::listeners::{EventKind, ListenerScope};
use crate::models::{Instructor, Student};
use crate::tab::{TabContent, UpdateAction};
use crate::view::{escape_html, Container};

const FILTER_TARGET: &str = "directory-filter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    Instructors,
    Students,
}

impl DirectoryKind {
    pub fn path(&self) -> &'static str {
        match self {
            DirectoryKind::Instructors => "/api/instructors",
            DirectoryKind::Students => "/api/students",
        }
    }

    fn table_id(&self) -> &'static str {
        match self {
            DirectoryKind::Instructors => "instructor-table",
            DirectoryKind::Students => "student-table",
        }
    }

    fn columns(&self) -> Vec<Column> {
        match self {
            DirectoryKind::Instructors => vec![
                Column::new("name", "Name"),
                Column::new("email", "Email"),
                Column::new("instruments", "Instruments").unsortable(),
            ],
            DirectoryKind::Students => vec![
                Column::new("name", "Name"),
                Column::new("grade", "Grade"),
            ],
        }
    }

    fn empty_message(&self) -> &'static str {
        match self {
            DirectoryKind::Instructors => "No instructors found",
            DirectoryKind::Students => "No students found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryMessage {
    Filter(String),
    NextPage,
    PreviousPage,
    Sort(String),
}

/// Filterable, paginated table of instructors or students
pub struct DirectoryTab {
    backend: Arc<dyn Backend>,
    kind: DirectoryKind,
    page_size: usize,
    table: Option<Component>,
}

impl DirectoryTab {
    pub fn new(backend: Arc<dyn Backend>, kind: DirectoryKind, page_size: usize) -> Self {
        Self {
            backend,
            kind,
            page_size,
            table: None,
        }
    }

    pub fn kind(&self) -> DirectoryKind {
        self.kind
    }

    /// Table built by the last render, dropped on unload
    pub fn table(&self) -> Option<&TableComponent> {
        self.table.as_ref().and_then(Component::as_table)
    }

    fn write_panel(table: &TableComponent, view: &mut Container) {
        let mut html = format!(
            r#"<div class="directory"><input type="search" id="{}" placeholder="Filter" value="{}">"#,
            FILTER_TARGET,
            escape_html(table.filter())
        );
        table.render(&mut html);
        html.push_str("</div>");
        view.set_html(html);
    }
}

#[async_trait]
impl TabContent for DirectoryTab {
    /// One row of display cells per person
    type Data = Vec<Vec<String>>;
    type Message = DirectoryMessage;

    async fn fetch_data(
        &self,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<String>>, TabError> {
        let backend = self.backend.as_ref();
        let path = self.kind.path();

        let rows: Vec<Vec<String>> = match self.kind {
            DirectoryKind::Instructors => fetch_as::<Vec<Instructor>>(backend, path, session, cancel)
                .await?
                .into_iter()
                .map(|i| {
                    vec![
                        i.full_name(),
                        i.email.clone().unwrap_or_default(),
                        i.instruments.join(", "),
                    ]
                })
                .collect(),
            DirectoryKind::Students => fetch_as::<Vec<Student>>(backend, path, session, cancel)
                .await?
                .into_iter()
                .map(|s| {
                    vec![
                        s.full_name(),
                        s.grade.map(|g| g.to_string()).unwrap_or_default(),
                    ]
                })
                .collect(),
        };
        Ok(rows)
    }

    fn render(&mut self, data: &Vec<Vec<String>>, view: &mut Container) -> Result<(), TabError> {
        let table = TableComponent::new(self.kind.table_id(), self.kind.columns(), self.page_size)
            .with_rows(data.clone())
            .with_empty_message(self.kind.empty_message());
        Self::write_panel(&table, view);
        self.table = Some(table.into());
        Ok(())
    }

    fn attach_event_listeners(&mut self, listeners: &mut ListenerScope<DirectoryMessage>) {
        listeners.on(FILTER_TARGET, EventKind::Input, |event| {
            event.value().map(|v| DirectoryMessage::Filter(v.to_string()))
        });
        listeners.on_click("next-page", DirectoryMessage::NextPage);
        listeners.on_click("prev-page", DirectoryMessage::PreviousPage);
        for column in self.kind.columns().into_iter().filter(|c| c.sortable) {
            listeners.on_click(format!("sort-{}", column.key), DirectoryMessage::Sort(column.key));
        }
    }

    fn update(
        &mut self,
        message: DirectoryMessage,
        _data: &Vec<Vec<String>>,
        view: &mut Container,
    ) -> Result<UpdateAction, TabError> {
        let Some(table) = self.table.as_mut().and_then(Component::as_table_mut) else {
            return Err(TabError::render("directory table is not rendered"));
        };

        match message {
            DirectoryMessage::Filter(text) => table.set_filter(&text),
            DirectoryMessage::NextPage => {
                table.next_page();
            }
            DirectoryMessage::PreviousPage => {
                table.previous_page();
            }
            DirectoryMessage::Sort(key) => {
                if let Err(e) = table.sort_by(&key) {
                    warn!("Ignoring sort request: {}", e);
                }
            }
        }
        debug!(
            "Directory {:?} now on page {}",
            self.kind,
            table.pagination().page
        );

        Self::write_panel(table, view);
        Ok(UpdateAction::Rendered)
    }

    fn cleanup(&mut self) {
        self.table = None;
    }
}
