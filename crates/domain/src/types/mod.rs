//! Domain types and models

pub mod auth;
pub mod calendar;
pub mod chat;

pub use auth::{
    client_id_prefix, AccessToken, AuthOutcome, CachedAccount, CredentialPair, DeviceFlowState,
    DevicePrompt,
};
pub use calendar::{
    Attendee, BulkDeleteSummary, CalendarEvent, DateTimeTimeZone, EmailAddress, EventDraft,
    EventPatch, ItemBody, Location, TimeWindow,
};
pub use chat::{ChatRole, ChatTurn};
