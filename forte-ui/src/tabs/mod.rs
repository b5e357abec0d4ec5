//! Concrete tabs

mod directory;
mod registration_form;
mod weekly_schedule;

pub use directory::{DirectoryKind, DirectoryMessage, DirectoryTab};
pub use registration_form::{
    RegistrationFormMessage, RegistrationFormTab, RegistrationKind, RegistrationOptions,
};
pub use weekly_schedule::{ScheduleMessage, ScheduleScope, WeeklyScheduleTab};

use chrono::Weekday;

/// Days lessons can be booked on, in display order
pub const LESSON_DAYS: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
