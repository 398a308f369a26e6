//! Calendar port interfaces
//!
//! One method per remote calendar operation. Every call takes an access token
//! obtained from the authentication service; implementations hold no token
//! state of their own.

use async_trait::async_trait;
use calmate_domain::{
    AccessToken, BulkDeleteSummary, CalendarEvent, EventDraft, EventPatch, Result, TimeWindow,
};

/// Trait for calendar provider operations
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Create an event (expects `201 Created`).
    async fn create_event(&self, token: &AccessToken, draft: &EventDraft) -> Result<CalendarEvent>;

    /// Events starting and ending inside `window`, ordered by start time.
    /// An empty list is not an error.
    async fn list_events(&self, token: &AccessToken, window: &TimeWindow)
        -> Result<Vec<CalendarEvent>>;

    /// Events in `window` whose subject starts with `subject_prefix`, in the
    /// order the service returns them.
    async fn find_events_by_subject(
        &self,
        token: &AccessToken,
        subject_prefix: &str,
        window: &TimeWindow,
    ) -> Result<Vec<CalendarEvent>>;

    /// Send only the fields set in `patch`.
    async fn update_event(
        &self,
        token: &AccessToken,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<CalendarEvent>;

    async fn delete_event(&self, token: &AccessToken, event_id: &str) -> Result<()>;

    /// Delete each event independently. Per-event failures are counted,
    /// never returned as an error.
    async fn delete_events(
        &self,
        token: &AccessToken,
        event_ids: &[String],
    ) -> Result<BulkDeleteSummary>;

    /// Read the event then write back its attendee list with `emails`
    /// appended. Returns how many were newly added.
    async fn add_attendees(
        &self,
        token: &AccessToken,
        event_id: &str,
        emails: &[String],
    ) -> Result<usize>;

    /// Read the event then write back its attendee list without `emails`.
    /// Returns how many were removed.
    async fn remove_attendees(
        &self,
        token: &AccessToken,
        event_id: &str,
        emails: &[String],
    ) -> Result<usize>;

    async fn set_location(&self, token: &AccessToken, event_id: &str, location: &str)
        -> Result<()>;
}
