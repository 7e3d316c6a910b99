//! Input validation shared by the planner operations. Each check returns the
//! normalised value or a `PlannerError::Validation` with a user-facing message.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate, NaiveTime};
use regex::Regex;

use cadence_types::models::TimeSlot;

use crate::{PlannerError, PlannerResult};

pub const NAME_MIN: usize = 3;
pub const NAME_MAX: usize = 100;
pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 200;
pub const FULL_NAME_MAX: usize = 255;
pub const PASSWORD_MIN: usize = 8;
/// Posts may be scheduled at most this many days ahead.
pub const PUBLISH_HORIZON_DAYS: u64 = 60;
pub const DEFAULT_COLOR: &str = "#3B82F6";

/// Context and project names. `label` is "Context" or "Project".
pub fn entity_name(label: &str, value: &str) -> PlannerResult<String> {
    let name = value.trim();
    if name.is_empty() {
        return Err(PlannerError::validation(format!("{label} name is required")));
    }
    let len = name.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&len) {
        return Err(PlannerError::validation(format!(
            "{label} name must be between {NAME_MIN} and {NAME_MAX} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn post_title(value: &str) -> PlannerResult<String> {
    let title = value.trim();
    let len = title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
        return Err(PlannerError::validation(format!(
            "Post title must be between {TITLE_MIN} and {TITLE_MAX} characters"
        )));
    }
    Ok(title.to_string())
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Lower-cased, trimmed address of the shape `local@domain.tld`.
pub fn email(value: &str) -> PlannerResult<String> {
    let email = value.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(PlannerError::validation("Invalid email format"));
    }
    Ok(email)
}

/// At least 8 characters with an upper-case letter, a lower-case letter and a digit.
pub fn password(value: &str) -> PlannerResult<()> {
    let strong = value.chars().count() >= PASSWORD_MIN
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_digit());
    if !strong {
        return Err(PlannerError::validation(
            "Password must be at least 8 characters with 1 uppercase, 1 lowercase, and 1 number",
        ));
    }
    Ok(())
}

pub fn full_name(value: &str) -> PlannerResult<String> {
    let name = value.trim();
    if name.is_empty() || name.chars().count() > FULL_NAME_MAX {
        return Err(PlannerError::validation("Full name is required"));
    }
    Ok(name.to_string())
}

pub fn timezone(value: Option<&str>) -> PlannerResult<String> {
    match value.map(str::trim) {
        None | Some("") => Ok("UTC".to_string()),
        Some(tz) if tz.len() <= 64 && !tz.chars().any(char::is_whitespace) => Ok(tz.to_string()),
        Some(_) => Err(PlannerError::validation("Invalid timezone")),
    }
}

/// `#RRGGBB`, defaulting to the house blue.
pub fn color_code(value: Option<&str>) -> PlannerResult<String> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_COLOR.to_string());
    };
    let valid = raw.len() == 7
        && raw.starts_with('#')
        && raw.chars().skip(1).all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(PlannerError::validation("Color code must look like #RRGGBB"));
    }
    Ok(raw.to_uppercase())
}

pub fn parse_publish_date(value: &str) -> PlannerResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| PlannerError::validation("Publish date must be a date in YYYY-MM-DD format"))
}

/// `today <= date <= today + 60 days`.
pub fn publish_window(date: NaiveDate, today: NaiveDate) -> PlannerResult<()> {
    if date < today {
        return Err(PlannerError::validation("Publish date cannot be in the past"));
    }
    let horizon = today.checked_add_days(Days::new(PUBLISH_HORIZON_DAYS)).unwrap_or(NaiveDate::MAX);
    if date > horizon {
        return Err(PlannerError::validation(
            "Publish date cannot be more than 60 days in the future",
        ));
    }
    Ok(())
}

pub fn time_slot(value: &str) -> PlannerResult<TimeSlot> {
    value
        .trim()
        .parse()
        .map_err(|_| PlannerError::validation("Time slot must be morning, noon, or evening"))
}

/// `HH:MM` or `HH:MM:SS`.
pub fn specific_time(value: &str) -> PlannerResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| PlannerError::validation("Specific time must be in HH:MM format"))
}

pub fn exclusive_schedule(slot: Option<TimeSlot>, time: Option<NaiveTime>) -> PlannerResult<()> {
    if slot.is_some() && time.is_some() {
        return Err(PlannerError::validation(
            "Cannot specify both time slot and specific time",
        ));
    }
    Ok(())
}
