//! Registration form tabs
//!
//! Private lessons pick an instructor and a day/time/length slot. Group
//! registrations pick an existing class. Both pick the student with an
//! autocomplete. Submitting posts the completed [`RegistrationRequest`] to
//! the backend, which decides eligibility; a rejection is shown on the form.

use std::sync::Arc;

use async_trait::async_trait;
use forte_common::{Role, SessionInfo};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{day_name, LESSON_DAYS};
use crate::api::{fetch_as, Backend};
use crate::components::{
    AutocompleteComponent, AutocompleteItem, Component, Render, SelectComponent, SelectOption,
};
use crate::error::{FetchError, TabError};
use crate::listeners::{EventKind, ListenerScope, UiEvent};
use crate::models::{GroupClass, Instructor, RegistrationRequest, RegistrationType, Student};
use crate::tab::{TabContent, UpdateAction};
use crate::view::{escape_html, Container};

const FORM_ID: &str = "registration-form";
const REGISTRATIONS_PATH: &str = "/api/registrations";
const STUDENT_FIELD: &str = "student";
const INSTRUCTOR_FIELD: &str = "instructor";
const CLASS_FIELD: &str = "class";
const DAY_FIELD: &str = "day";
const TIME_FIELD: &str = "start-time";
const LENGTH_FIELD: &str = "length";

/// Bookable start times for private lessons
const START_TIMES: [&str; 10] = [
    "14:00", "14:30", "15:00", "15:30", "16:00", "16:30", "17:00", "17:30", "18:00", "18:30",
];

/// Private lesson lengths in minutes
const LESSON_LENGTHS: [u32; 3] = [30, 45, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Private,
    Group,
}

impl RegistrationKind {
    fn registration_type(&self) -> RegistrationType {
        match self {
            RegistrationKind::Private => RegistrationType::Private,
            RegistrationKind::Group => RegistrationType::Group,
        }
    }
}

/// Choices offered by the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationOptions {
    pub instructors: Vec<Instructor>,
    pub students: Vec<Student>,
    /// Empty for private registrations
    pub classes: Vec<GroupClass>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationFormMessage {
    StudentQuery(String),
    StudentChosen(String),
    Selected { field: String, value: String },
    Submit,
    /// Backend answer to a submit; `Err` carries the message to show
    Submitted(Result<(), String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormStatus {
    Editing,
    Submitting,
    Registered,
    Rejected(String),
}

struct FormField {
    label: &'static str,
    component: Component,
}

/// Form state for one load cycle
struct RegistrationForm {
    kind: RegistrationKind,
    fields: Vec<FormField>,
    status: FormStatus,
}

impl RegistrationForm {
    fn build(kind: RegistrationKind, options: &RegistrationOptions) -> Self {
        let students = options
            .students
            .iter()
            .map(|s| AutocompleteItem::new(&s.id, s.full_name()))
            .collect();

        let mut fields = vec![FormField {
            label: "Student",
            component: AutocompleteComponent::new(STUDENT_FIELD, students).into(),
        }];

        match kind {
            RegistrationKind::Private => {
                let instructors = options
                    .instructors
                    .iter()
                    .map(|i| SelectOption::new(&i.id, i.full_name()));
                fields.push(FormField {
                    label: "Instructor",
                    component: SelectComponent::new(INSTRUCTOR_FIELD)
                        .with_placeholder("Choose an instructor")
                        .with_options(instructors)
                        .into(),
                });
                fields.push(FormField {
                    label: "Day",
                    component: SelectComponent::new(DAY_FIELD)
                        .with_placeholder("Choose a day")
                        .with_options(
                            LESSON_DAYS
                                .iter()
                                .map(|d| SelectOption::new(day_name(*d), day_name(*d))),
                        )
                        .into(),
                });
                fields.push(FormField {
                    label: "Start time",
                    component: SelectComponent::new(TIME_FIELD)
                        .with_placeholder("Choose a time")
                        .with_options(START_TIMES.iter().map(|t| SelectOption::new(*t, *t)))
                        .into(),
                });
                fields.push(FormField {
                    label: "Length",
                    component: SelectComponent::new(LENGTH_FIELD)
                        .with_placeholder("Choose a length")
                        .with_options(LESSON_LENGTHS.iter().map(|m| {
                            SelectOption::new(m.to_string(), format!("{} minutes", m))
                        }))
                        .into(),
                });
            }
            RegistrationKind::Group => {
                let classes = options.classes.iter().map(|c| {
                    SelectOption::new(
                        &c.id,
                        format!("{} ({} {})", c.title, c.day, c.start_time),
                    )
                });
                fields.push(FormField {
                    label: "Class",
                    component: SelectComponent::new(CLASS_FIELD)
                        .with_placeholder("Choose a class")
                        .with_options(classes)
                        .into(),
                });
            }
        }

        Self {
            kind,
            fields,
            status: FormStatus::Editing,
        }
    }

    fn student(&self) -> Option<&AutocompleteComponent> {
        self.fields.iter().find_map(|f| f.component.as_autocomplete())
    }

    fn student_mut(&mut self) -> Option<&mut AutocompleteComponent> {
        self.fields
            .iter_mut()
            .find_map(|f| f.component.as_autocomplete_mut())
    }

    fn select(&self, id: &str) -> Option<&SelectComponent> {
        self.fields
            .iter()
            .filter_map(|f| f.component.as_select())
            .find(|c| c.id() == id)
    }

    fn select_mut(&mut self, id: &str) -> Option<&mut SelectComponent> {
        self.fields
            .iter_mut()
            .filter_map(|f| f.component.as_select_mut())
            .find(|c| c.id() == id)
    }

    fn selected(&self, id: &str) -> Option<String> {
        self.select(id)?.selected().map(str::to_string)
    }

    fn select_ids(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter_map(|f| f.component.as_select())
            .map(|c| c.id().to_string())
            .collect()
    }

    /// Request assembled from the current choices, once every field is set
    fn draft(&self) -> Option<RegistrationRequest> {
        let student_id = self.student()?.selected()?.to_string();

        match self.kind {
            RegistrationKind::Private => Some(RegistrationRequest {
                registration_type: self.kind.registration_type(),
                student_id,
                instructor_id: Some(self.selected(INSTRUCTOR_FIELD)?),
                class_id: None,
                day: Some(self.selected(DAY_FIELD)?),
                start_time: Some(self.selected(TIME_FIELD)?),
                length: Some(self.selected(LENGTH_FIELD)?.parse().ok()?),
            }),
            RegistrationKind::Group => Some(RegistrationRequest {
                registration_type: self.kind.registration_type(),
                student_id,
                instructor_id: None,
                class_id: Some(self.selected(CLASS_FIELD)?),
                day: None,
                start_time: None,
                length: None,
            }),
        }
    }

    fn write(&self, view: &mut Container) {
        let kind = match self.kind {
            RegistrationKind::Private => "private",
            RegistrationKind::Group => "group",
        };
        let mut html = format!(
            r#"<form id="{}" class="registration-form" data-kind="{}">"#,
            FORM_ID, kind
        );
        for field in &self.fields {
            html.push_str(&format!(
                r#"<div class="form-field"><label for="{}">{}</label>"#,
                field.component.id(),
                field.label
            ));
            field.component.render(&mut html);
            html.push_str("</div>");
        }
        match &self.status {
            FormStatus::Editing => {}
            FormStatus::Submitting => {
                html.push_str(r#"<p class="form-status" role="status">Submitting&hellip;</p>"#)
            }
            FormStatus::Registered => {
                html.push_str(r#"<p class="form-status success" role="status">Registration saved</p>"#)
            }
            FormStatus::Rejected(message) => html.push_str(&format!(
                r#"<p class="form-status error" role="alert">{}</p>"#,
                escape_html(message)
            )),
        }
        let ready = self.draft().is_some() && self.status != FormStatus::Submitting;
        let disabled = if ready { "" } else { " disabled" };
        html.push_str(&format!(
            r#"<button type="submit"{}>Register</button></form>"#,
            disabled
        ));
        view.set_html(html);
    }
}

pub struct RegistrationFormTab {
    backend: Arc<dyn Backend>,
    kind: RegistrationKind,
    form: Option<RegistrationForm>,
}

impl RegistrationFormTab {
    pub fn new(backend: Arc<dyn Backend>, kind: RegistrationKind) -> Self {
        Self {
            backend,
            kind,
            form: None,
        }
    }

    pub fn kind(&self) -> RegistrationKind {
        self.kind
    }

    /// Completed draft, if every field has a value
    pub fn draft(&self) -> Option<RegistrationRequest> {
        self.form.as_ref()?.draft()
    }

    /// Students visible to `session`: a parent only sees their own children
    fn students_path(session: &SessionInfo) -> Result<String, FetchError> {
        match session.role {
            Some(Role::Parent) => session
                .user_id
                .as_ref()
                .map(|id| format!("/api/parents/{}/students", id))
                .ok_or(FetchError::Unauthenticated),
            _ => Ok("/api/students".to_string()),
        }
    }
}

#[async_trait]
impl TabContent for RegistrationFormTab {
    type Data = RegistrationOptions;
    type Message = RegistrationFormMessage;

    async fn fetch_data(
        &self,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<RegistrationOptions, TabError> {
        let backend = self.backend.as_ref();
        let students_path = Self::students_path(session)?;

        let instructors = fetch_as::<Vec<Instructor>>(backend, "/api/instructors", session, cancel);
        let students = fetch_as::<Vec<Student>>(backend, &students_path, session, cancel);

        match self.kind {
            RegistrationKind::Private => {
                let (instructors, students) = tokio::try_join!(instructors, students)?;
                Ok(RegistrationOptions {
                    instructors,
                    students,
                    classes: Vec::new(),
                })
            }
            RegistrationKind::Group => {
                let classes = fetch_as::<Vec<GroupClass>>(backend, "/api/classes", session, cancel);
                let (instructors, students, classes) =
                    tokio::try_join!(instructors, students, classes)?;
                Ok(RegistrationOptions {
                    instructors,
                    students,
                    classes,
                })
            }
        }
    }

    fn render(&mut self, data: &RegistrationOptions, view: &mut Container) -> Result<(), TabError> {
        let form = RegistrationForm::build(self.kind, data);
        form.write(view);
        self.form = Some(form);
        Ok(())
    }

    fn attach_event_listeners(&mut self, listeners: &mut ListenerScope<RegistrationFormMessage>) {
        listeners.on(format!("{}-input", STUDENT_FIELD), EventKind::Input, |event| {
            event
                .value()
                .map(|v| RegistrationFormMessage::StudentQuery(v.to_string()))
        });
        listeners.on(FORM_ID, EventKind::Submit, |_| {
            Some(RegistrationFormMessage::Submit)
        });
        listeners.on(
            format!("{}-suggestions", STUDENT_FIELD),
            EventKind::Change,
            |event| {
                event
                    .value()
                    .map(|v| RegistrationFormMessage::StudentChosen(v.to_string()))
            },
        );

        let select_ids = self
            .form
            .as_ref()
            .map(RegistrationForm::select_ids)
            .unwrap_or_default();
        for id in select_ids {
            let field = id.clone();
            listeners.on(id, EventKind::Change, move |event: &UiEvent| {
                event.value().map(|v| RegistrationFormMessage::Selected {
                    field: field.clone(),
                    value: v.to_string(),
                })
            });
        }
    }

    fn update(
        &mut self,
        message: RegistrationFormMessage,
        data: &RegistrationOptions,
        view: &mut Container,
    ) -> Result<UpdateAction, TabError> {
        let Some(form) = self.form.as_mut() else {
            return Err(TabError::render("registration form is not rendered"));
        };

        let result = match message {
            RegistrationFormMessage::Submit => {
                if form.status == FormStatus::Submitting {
                    debug!("Registration already being submitted");
                    return Ok(UpdateAction::Rendered);
                }
                if form.draft().is_none() {
                    warn!("Registration submitted before every field was set");
                    return Ok(UpdateAction::Rendered);
                }
                form.status = FormStatus::Submitting;
                form.write(view);
                return Ok(UpdateAction::Submit);
            }
            RegistrationFormMessage::Submitted(Ok(())) => {
                *form = RegistrationForm::build(self.kind, data);
                form.status = FormStatus::Registered;
                Ok(())
            }
            RegistrationFormMessage::Submitted(Err(message)) => {
                form.status = FormStatus::Rejected(message);
                Ok(())
            }
            RegistrationFormMessage::StudentQuery(query) => {
                form.status = FormStatus::Editing;
                if let Some(student) = form.student_mut() {
                    student.set_query(&query);
                }
                Ok(())
            }
            RegistrationFormMessage::StudentChosen(value) => {
                form.status = FormStatus::Editing;
                match form.student_mut() {
                    Some(student) => student.choose(&value),
                    None => Ok(()),
                }
            }
            RegistrationFormMessage::Selected { field, value } => {
                form.status = FormStatus::Editing;
                match form.select_mut(&field) {
                    Some(select) => select.select(&value),
                    None => {
                        debug!("No select named '{}' on the form", field);
                        Ok(())
                    }
                }
            }
        };
        if let Err(e) = result {
            warn!("Registration form input rejected: {}", e);
        }

        form.write(view);
        Ok(UpdateAction::Rendered)
    }

    async fn submit(
        &self,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<RegistrationFormMessage, TabError> {
        let Some(draft) = self.draft() else {
            return Err(TabError::ContractViolation(
                "registration submitted without a complete draft".to_string(),
            ));
        };
        let body = match serde_json::to_value(&draft) {
            Ok(body) => body,
            Err(e) => {
                return Ok(RegistrationFormMessage::Submitted(Err(format!(
                    "Could not encode registration: {}",
                    e
                ))))
            }
        };

        match self
            .backend
            .post_json(REGISTRATIONS_PATH, &body, session, cancel)
            .await
        {
            Ok(_) => {
                info!(
                    "Registered student '{}' ({:?})",
                    draft.student_id, draft.registration_type
                );
                Ok(RegistrationFormMessage::Submitted(Ok(())))
            }
            Err(TabError::Fetch(e)) => {
                warn!("Registration rejected: {}", e);
                Ok(RegistrationFormMessage::Submitted(Err(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }

    fn cleanup(&mut self) {
        self.form = None;
    }
}
