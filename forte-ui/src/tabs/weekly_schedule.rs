//! Weekly schedule tab
//!
//! Lists registrations grouped by lesson day. The same tab serves the admin
//! (everything), instructor (own lessons) and parent (own children) views.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Weekday};
use forte_common::SessionInfo;
use tokio_util::sync::CancellationToken;

use super::{day_name, LESSON_DAYS};
use crate::api::{fetch_as, Backend};
use crate::error::{FetchError, TabError};
use crate::listeners::ListenerScope;
use crate::models::{Registration, RegistrationType, ScheduleResponse};
use crate::tab::{TabContent, UpdateAction};
use crate::view::{escape_html, Container};

const EMPTY_MESSAGE: &str = "No scheduled lessons";
const REFRESH_TARGET: &str = "refresh-schedule";

/// Whose registrations the schedule shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleScope {
    Admin,
    Instructor,
    Parent,
}

impl ScheduleScope {
    /// Backend route for `session`
    pub fn path(&self, session: &SessionInfo) -> Result<String, FetchError> {
        match self {
            ScheduleScope::Admin => Ok("/api/registrations".to_string()),
            ScheduleScope::Instructor => session
                .user_id
                .as_ref()
                .map(|id| format!("/api/instructors/{}/registrations", id))
                .ok_or(FetchError::Unauthenticated),
            ScheduleScope::Parent => session
                .user_id
                .as_ref()
                .map(|id| format!("/api/parents/{}/registrations", id))
                .ok_or(FetchError::Unauthenticated),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleMessage {
    Refresh,
}

pub struct WeeklyScheduleTab {
    backend: Arc<dyn Backend>,
    scope: ScheduleScope,
}

impl WeeklyScheduleTab {
    pub fn new(backend: Arc<dyn Backend>, scope: ScheduleScope) -> Self {
        Self { backend, scope }
    }

    pub fn scope(&self) -> ScheduleScope {
        self.scope
    }
}

struct Lesson<'a> {
    start: NaiveTime,
    registration: &'a Registration,
}

/// Registrations bucketed by lesson day, each day sorted by start time
fn group_by_day(registrations: &[Registration]) -> Result<BTreeMap<usize, Vec<Lesson<'_>>>, TabError> {
    let mut days: BTreeMap<usize, Vec<Lesson<'_>>> = BTreeMap::new();

    for registration in registrations {
        let day: Weekday = registration.day.parse().map_err(|_| {
            TabError::render(format!(
                "Unrecognized day '{}' for registration {}",
                registration.day, registration.id
            ))
        })?;
        let slot = LESSON_DAYS.iter().position(|d| *d == day).ok_or_else(|| {
            TabError::render(format!(
                "No lessons are held on {} (registration {})",
                day_name(day),
                registration.id
            ))
        })?;
        let start = NaiveTime::parse_from_str(&registration.start_time, "%H:%M").map_err(|_| {
            TabError::render(format!(
                "Unrecognized start time '{}' for registration {}",
                registration.start_time, registration.id
            ))
        })?;

        days.entry(slot).or_default().push(Lesson { start, registration });
    }

    for lessons in days.values_mut() {
        lessons.sort_by_key(|lesson| lesson.start);
    }
    Ok(days)
}

fn render_lesson(out: &mut String, lesson: &Lesson<'_>) {
    let reg = lesson.registration;
    let end = lesson.start + Duration::minutes(i64::from(reg.length));
    let student = reg.student_name.as_deref().unwrap_or(&reg.student_id);
    let instructor = reg.instructor_name.as_deref().unwrap_or(&reg.instructor_id);

    let mut detail = escape_html(instructor);
    if let Some(instrument) = &reg.instrument {
        detail.push_str(&format!(" ({})", escape_html(instrument)));
    }
    if reg.registration_type == RegistrationType::Group {
        let class = reg.class_name.as_deref().unwrap_or("Group class");
        detail.push_str(&format!(" &middot; {}", escape_html(class)));
    }

    out.push_str(&format!(
        concat!(
            r#"<li class="lesson" data-registration="{}">"#,
            r#"<span class="lesson-time">{}-{}</span> "#,
            r#"<span class="lesson-student">{}</span> "#,
            r#"<span class="lesson-detail">{}</span>"#,
            "</li>"
        ),
        escape_html(&reg.id),
        lesson.start.format("%H:%M"),
        end.format("%H:%M"),
        escape_html(student),
        detail
    ));
}

#[async_trait]
impl TabContent for WeeklyScheduleTab {
    type Data = ScheduleResponse;
    type Message = ScheduleMessage;

    async fn fetch_data(
        &self,
        session: &SessionInfo,
        cancel: &CancellationToken,
    ) -> Result<ScheduleResponse, TabError> {
        let path = self.scope.path(session)?;
        fetch_as(self.backend.as_ref(), &path, session, cancel).await
    }

    fn render(&mut self, data: &ScheduleResponse, view: &mut Container) -> Result<(), TabError> {
        let mut html = String::from(r#"<div class="weekly-schedule">"#);
        html.push_str(&format!(
            r#"<button type="button" id="{}">Refresh</button>"#,
            REFRESH_TARGET
        ));

        if data.registrations.is_empty() {
            html.push_str(&format!(r#"<p class="empty-state">{}</p></div>"#, EMPTY_MESSAGE));
            view.set_html(html);
            return Ok(());
        }

        for (slot, lessons) in group_by_day(&data.registrations)? {
            let name = day_name(LESSON_DAYS[slot]);
            html.push_str(&format!(
                r#"<section class="schedule-day" data-day="{}"><h3>{}</h3><ul>"#,
                name, name
            ));
            for lesson in &lessons {
                render_lesson(&mut html, lesson);
            }
            html.push_str("</ul></section>");
        }
        html.push_str("</div>");

        view.set_html(html);
        Ok(())
    }

    fn attach_event_listeners(&mut self, listeners: &mut ListenerScope<ScheduleMessage>) {
        listeners.on_click(REFRESH_TARGET, ScheduleMessage::Refresh);
    }

    fn update(
        &mut self,
        message: ScheduleMessage,
        _data: &ScheduleResponse,
        _view: &mut Container,
    ) -> Result<UpdateAction, TabError> {
        match message {
            ScheduleMessage::Refresh => Ok(UpdateAction::Reload),
        }
    }
}
