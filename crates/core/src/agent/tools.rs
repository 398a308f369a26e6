//! Calendar tools exposed to the language model
//!
//! Each tool deserializes its arguments, calls straight through to the
//! [`CalendarGateway`] and renders the result as text for the model.

use std::fmt::Write as _;
use std::sync::Arc;

use calmate_domain::{
    AccessToken, CalmateError, CalendarEvent, EventDraft, EventPatch, Result, TimeWindow,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::ports::{ToolCall, ToolSpec};
use crate::calendar_ports::CalendarGateway;

const NO_EVENTS_IN_WINDOW: &str = "No events found for this time period.";
const NO_MATCHING_EVENTS: &str = "No events found matching your criteria.";

#[derive(Debug, Deserialize)]
struct CreateEventArgs {
    subject: String,
    start_time: String,
    end_time: String,
    #[serde(default)]
    attendees: Option<Vec<String>>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetEventsArgs {
    time_window: TimeWindow,
}

#[derive(Debug, Deserialize)]
struct FindEventArgs {
    subject: String,
    time_window: TimeWindow,
}

#[derive(Debug, Deserialize)]
struct UpdateEventArgs {
    event_id: String,
    #[serde(default)]
    new_start_time: Option<String>,
    #[serde(default)]
    new_end_time: Option<String>,
    #[serde(default)]
    new_subject: Option<String>,
    #[serde(default)]
    new_body: Option<String>,
    #[serde(default)]
    new_location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventIdArgs {
    event_id: String,
}

/// Models send the id list either as a JSON-encoded string or as an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventIdList {
    List(Vec<String>),
    Encoded(String),
}

#[derive(Debug, Deserialize)]
struct DeleteMultipleArgs {
    #[serde(alias = "event_ids")]
    event_ids_json: EventIdList,
}

#[derive(Debug, Deserialize)]
struct AttendeesArgs {
    event_id: String,
    attendee_emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LocationArgs {
    event_id: String,
    location: String,
}

fn time_window_schema() -> Value {
    json!({
        "type": "object",
        "description": "Time window with 'start' and 'end' in ISO format, e.g. {\"start\": \"2025-01-23T00:00:00\", \"end\": \"2025-01-23T23:59:59\"}",
        "properties": {
            "start": {"type": "string"},
            "end": {"type": "string"}
        },
        "required": ["start", "end"]
    })
}

/// Tool manifest plus dispatch onto the calendar gateway
#[derive(Clone)]
pub struct CalendarToolbox {
    gateway: Arc<dyn CalendarGateway>,
    default_time_zone: String,
}

impl CalendarToolbox {
    /// Toolbox calling through to `gateway`.
    pub fn new(gateway: Arc<dyn CalendarGateway>) -> Self {
        Self { gateway, default_time_zone: calmate_domain::constants::DEFAULT_TIME_ZONE.to_string() }
    }

    /// Time zone for created events that name none.
    pub fn with_default_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.default_time_zone = time_zone.into();
        self
    }

    /// The nine calendar tools with their argument schemas.
    pub fn manifest(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "create_event",
                description: "Creates a calendar event. Parameters: subject (event title), start_time (ISO format like '2025-09-01T14:00:00'), end_time (ISO format), attendees (optional list of emails), body (optional description), location (optional).",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "subject": {"type": "string"},
                        "start_time": {"type": "string"},
                        "end_time": {"type": "string"},
                        "attendees": {"type": "array", "items": {"type": "string"}},
                        "body": {"type": "string"},
                        "location": {"type": "string"}
                    },
                    "required": ["subject", "start_time", "end_time"]
                }),
            },
            ToolSpec {
                name: "get_events",
                description: "Gets ALL events in a time period. Use when the user asks 'what events do I have today/this week/etc'.",
                parameters: json!({
                    "type": "object",
                    "properties": {"time_window": time_window_schema()},
                    "required": ["time_window"]
                }),
            },
            ToolSpec {
                name: "find_event",
                description: "Finds events whose subject starts with the given text. Use when the user mentions a specific event name.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "subject": {"type": "string"},
                        "time_window": time_window_schema()
                    },
                    "required": ["subject", "time_window"]
                }),
            },
            ToolSpec {
                name: "update_event",
                description: "Updates event details. Only the provided fields change. Parameters: event_id (required), new_start_time, new_end_time, new_subject, new_body, new_location (all optional).",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "event_id": {"type": "string"},
                        "new_start_time": {"type": "string"},
                        "new_end_time": {"type": "string"},
                        "new_subject": {"type": "string"},
                        "new_body": {"type": "string"},
                        "new_location": {"type": "string"}
                    },
                    "required": ["event_id"]
                }),
            },
            ToolSpec {
                name: "delete_event",
                description: "Deletes a single event. Parameter: event_id (from a find_event or get_events result).",
                parameters: json!({
                    "type": "object",
                    "properties": {"event_id": {"type": "string"}},
                    "required": ["event_id"]
                }),
            },
            ToolSpec {
                name: "delete_multiple",
                description: "Deletes multiple events at once. Parameter: event_ids_json (JSON string array of event IDs from a find_event result). Example: '[\"id1\", \"id2\"]'",
                parameters: json!({
                    "type": "object",
                    "properties": {"event_ids_json": {"type": "string"}},
                    "required": ["event_ids_json"]
                }),
            },
            ToolSpec {
                name: "add_attendees",
                description: "Adds attendees to an existing event. Parameters: event_id (from find_event), attendee_emails (list of email addresses).",
                parameters: attendees_schema(),
            },
            ToolSpec {
                name: "remove_attendees",
                description: "Removes attendees from an existing event. Parameters: event_id (from find_event), attendee_emails (list of email addresses to remove).",
                parameters: attendees_schema(),
            },
            ToolSpec {
                name: "set_location",
                description: "Sets or updates the location of an event. Parameters: event_id (from find_event), location (location name/address).",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "event_id": {"type": "string"},
                        "location": {"type": "string"}
                    },
                    "required": ["event_id", "location"]
                }),
            },
        ]
    }

    /// Run one tool call and render its result.
    pub async fn invoke(&self, token: &AccessToken, call: &ToolCall) -> Result<String> {
        debug!(tool = %call.name, "Invoking calendar tool");
        let gateway = self.gateway.as_ref();

        match call.name.as_str() {
            "create_event" => {
                let args: CreateEventArgs = parse_args(call)?;
                let draft = EventDraft {
                    subject: args.subject,
                    start: args.start_time,
                    end: args.end_time,
                    time_zone: self.default_time_zone.clone(),
                    attendees: args.attendees.unwrap_or_default(),
                    body: args.body.unwrap_or_default(),
                    location: args.location,
                };
                let event = gateway.create_event(token, &draft).await?;
                Ok(format!(
                    "Event '{}' created successfully from {} to {}. Event ID: {}",
                    draft.subject, draft.start, draft.end, event.id
                ))
            }
            "get_events" => {
                let args: GetEventsArgs = parse_args(call)?;
                let events = gateway.list_events(token, &args.time_window).await?;
                Ok(format_event_list(&events, NO_EVENTS_IN_WINDOW))
            }
            "find_event" => {
                let args: FindEventArgs = parse_args(call)?;
                let events =
                    gateway.find_events_by_subject(token, &args.subject, &args.time_window).await?;
                Ok(format_event_list(&events, NO_MATCHING_EVENTS))
            }
            "update_event" => {
                let args: UpdateEventArgs = parse_args(call)?;
                let patch = EventPatch {
                    subject: args.new_subject,
                    start: args.new_start_time,
                    end: args.new_end_time,
                    body: args.new_body,
                    location: args.new_location,
                    time_zone: self.default_time_zone.clone(),
                };
                gateway.update_event(token, &args.event_id, &patch).await?;
                Ok("Event updated successfully.".to_string())
            }
            "delete_event" => {
                let args: EventIdArgs = parse_args(call)?;
                gateway.delete_event(token, &args.event_id).await?;
                Ok("Event deleted successfully.".to_string())
            }
            "delete_multiple" => {
                let args: DeleteMultipleArgs = parse_args(call)?;
                let ids = match args.event_ids_json {
                    EventIdList::List(ids) => ids,
                    EventIdList::Encoded(raw) => serde_json::from_str(&raw).map_err(|e| {
                        CalmateError::InvalidInput(format!(
                            "event_ids_json must be a JSON array of strings: {e}"
                        ))
                    })?,
                };
                let summary = gateway.delete_events(token, &ids).await?;
                Ok(format!(
                    "Deleted {} event(s) successfully. Failed: {}",
                    summary.deleted, summary.failed
                ))
            }
            "add_attendees" => {
                let args: AttendeesArgs = parse_args(call)?;
                let added = gateway.add_attendees(token, &args.event_id, &args.attendee_emails).await?;
                Ok(format!("Added {added} attendee(s) successfully."))
            }
            "remove_attendees" => {
                let args: AttendeesArgs = parse_args(call)?;
                let removed =
                    gateway.remove_attendees(token, &args.event_id, &args.attendee_emails).await?;
                Ok(format!("Removed {removed} attendee(s) successfully."))
            }
            "set_location" => {
                let args: LocationArgs = parse_args(call)?;
                gateway.set_location(token, &args.event_id, &args.location).await?;
                Ok(format!("Event location updated to '{}'.", args.location))
            }
            other => Err(CalmateError::InvalidInput(format!("Unknown tool: {other}"))),
        }
    }
}

fn attendees_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "event_id": {"type": "string"},
            "attendee_emails": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["event_id", "attendee_emails"]
    })
}

fn parse_args<T: DeserializeOwned>(call: &ToolCall) -> Result<T> {
    serde_json::from_value(call.arguments.clone()).map_err(|e| {
        CalmateError::InvalidInput(format!("Invalid arguments for {}: {e}", call.name))
    })
}

/// Listing text shared by `get_events` and `find_event`.
pub fn format_event_list(events: &[CalendarEvent], empty_message: &str) -> String {
    if events.is_empty() {
        return empty_message.to_string();
    }

    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    let mut out = format!(
        "Found {} event(s). Event IDs: {}\n\n",
        events.len(),
        serde_json::to_string(&ids).unwrap_or_default()
    );
    for event in events {
        let _ = writeln!(out, "- {}", event.subject_or_default());
        let _ = writeln!(out, "   ID: {}", event.id);
        if let Some(start) = &event.start {
            let _ = writeln!(out, "   Start: {}", start.date_time);
        }
        if let Some(end) = &event.end {
            let _ = writeln!(out, "   End: {}", end.date_time);
        }
        if let Some(location) = event.location_name() {
            let _ = writeln!(out, "   Location: {location}");
        }
        if !event.attendees.is_empty() {
            let names: Vec<&str> =
                event.attendees.iter().map(|a| a.email_address.address.as_str()).collect();
            let _ = writeln!(out, "   Attendees: {}", names.join(", "));
        }
        out.push('\n');
    }
    out
}
