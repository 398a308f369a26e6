//! Request and response bodies for `/me/events`

use calmate_domain::{
    Attendee, CalendarEvent, DateTimeTimeZone, EventDraft, EventPatch, ItemBody, Location,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewEventBody {
    pub subject: String,
    pub start: DateTimeTimeZone,
    pub end: DateTimeTimeZone,
    pub attendees: Vec<Attendee>,
    pub body: ItemBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl From<&EventDraft> for NewEventBody {
    fn from(draft: &EventDraft) -> Self {
        Self {
            subject: draft.subject.clone(),
            start: DateTimeTimeZone::new(&draft.start, &draft.time_zone),
            end: DateTimeTimeZone::new(&draft.end, &draft.time_zone),
            attendees: draft.attendees.iter().map(Attendee::required).collect(),
            body: ItemBody::html(&draft.body),
            location: draft.location.as_deref().map(Location::named),
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventPatchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTimeTimeZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTimeTimeZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ItemBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl From<&EventPatch> for EventPatchBody {
    fn from(patch: &EventPatch) -> Self {
        Self {
            subject: patch.subject.clone(),
            start: patch.start.as_deref().map(|s| DateTimeTimeZone::new(s, &patch.time_zone)),
            end: patch.end.as_deref().map(|e| DateTimeTimeZone::new(e, &patch.time_zone)),
            body: patch.body.as_deref().map(ItemBody::html),
            location: patch.location.as_deref().map(Location::named),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttendeesBody<'a> {
    pub attendees: &'a [Attendee],
}

#[derive(Debug, Serialize)]
pub(crate) struct LocationBody {
    pub location: Location,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventCollection {
    #[serde(default)]
    pub value: Vec<CalendarEvent>,
}
