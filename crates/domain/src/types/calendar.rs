//! Calendar event types
//!
//! Mirrors the Microsoft Graph event resource closely enough to round-trip
//! the fields this application reads and writes.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TIME_ZONE;

/// Event as returned by the calendar API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub start: Option<DateTimeTimeZone>,
    #[serde(default)]
    pub end: Option<DateTimeTimeZone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ItemBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
}

impl CalendarEvent {
    /// Subject, or a placeholder for untitled events.
    pub fn subject_or_default(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no subject)")
    }

    /// Display name of the location, when one is set and non-empty.
    pub fn location_name(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.display_name.as_deref()).filter(|n| !n.is_empty())
    }
}

/// Graph `dateTimeTimeZone`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeTimeZone {
    /// ISO-8601 local date-time, e.g. `2026-03-02T09:00:00`
    pub date_time: String,
    pub time_zone: String,
}

impl DateTimeTimeZone {
    /// Timestamp in `time_zone`.
    pub fn new(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self { date_time: date_time.into(), time_zone: time_zone.into() }
    }
}

/// Graph `itemBody`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: String,
    pub content: String,
}

impl ItemBody {
    /// HTML body.
    pub fn html(content: impl Into<String>) -> Self {
        Self { content_type: "HTML".to_string(), content: content.into() }
    }
}

/// Graph `location`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Location {
    /// Location with only a display name.
    pub fn named(display_name: impl Into<String>) -> Self {
        Self { display_name: Some(display_name.into()) }
    }
}

/// Graph `attendee`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email_address: EmailAddress,
    #[serde(rename = "type", default = "required_attendee")]
    pub attendee_type: String,
}

fn required_attendee() -> String {
    "required".to_string()
}

impl Attendee {
    /// Required attendee with `address`.
    pub fn required(address: impl Into<String>) -> Self {
        Self {
            email_address: EmailAddress { address: address.into(), name: None },
            attendee_type: required_attendee(),
        }
    }

    /// Case-insensitive address match.
    pub fn has_address(&self, address: &str) -> bool {
        self.email_address.address.eq_ignore_ascii_case(address.trim())
    }
}

/// Graph `emailAddress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Caller-supplied time window; strings are passed through unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

impl TimeWindow {
    /// Window between two ISO-8601 timestamps.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: start.into(), end: end.into() }
    }
}

/// New event to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub subject: String,
    pub start: String,
    pub end: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default)]
    pub attendees: Vec<String>,
    /// HTML body content
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl Default for EventPatch {
    fn default() -> Self {
        Self {
            subject: None,
            start: None,
            end: None,
            body: None,
            location: None,
            time_zone: default_time_zone(),
        }
    }
}

impl EventPatch {
    /// Whether no field would change.
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.body.is_none()
            && self.location.is_none()
    }
}

/// Outcome of a bulk delete. Which IDs failed is not reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteSummary {
    pub deleted: usize,
    pub failed: usize,
}
