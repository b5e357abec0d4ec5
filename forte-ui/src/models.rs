//! Backend payloads
//!
//! Shapes of the JSON exchanged with the REST server. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationType {
    #[default]
    Private,
    Group,
}

/// A booked lesson or class slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub student_name: Option<String>,
    pub instructor_id: String,
    #[serde(default)]
    pub instructor_name: Option<String>,
    /// Weekday name, e.g. "Monday"
    pub day: String,
    /// Start time, "HH:MM"
    pub start_time: String,
    /// Lesson length in minutes
    pub length: u32,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub registration_type: RegistrationType,
    #[serde(default)]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub registrations: Vec<Registration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub instruments: Vec<String>,
}

impl Instructor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub grade: Option<u8>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupClass {
    pub id: String,
    pub title: String,
    pub instructor_id: String,
    pub day: String,
    pub start_time: String,
    pub length: u32,
}

/// Draft submitted by the registration forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub registration_type: RegistrationType,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}
