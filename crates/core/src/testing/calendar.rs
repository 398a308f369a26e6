//! In-memory calendar gateway

use std::sync::Mutex;

use async_trait::async_trait;
use calmate_domain::{
    AccessToken, Attendee, BulkDeleteSummary, CalendarEvent, CalmateError, DateTimeTimeZone,
    EventDraft, EventPatch, ItemBody, Location, Result, TimeWindow,
};

use crate::calendar_ports::CalendarGateway;

#[derive(Default)]
struct CalendarState {
    events: Vec<CalendarEvent>,
    next_id: usize,
}

/// Calendar held in a vector; unknown event IDs answer like a 404.
///
/// Window filters compare the ISO strings lexically, which is what the
/// remote service effectively does for same-format timestamps.
#[derive(Default)]
pub struct InMemoryCalendar {
    state: Mutex<CalendarState>,
}

impl InMemoryCalendar {
    /// Empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calendar preloaded with `events`, in order.
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self { state: Mutex::new(CalendarState { events, next_id: 0 }) }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, CalendarState> {
        // Test utility: panic on poisoned mutex to fail tests early
        self.state.lock().expect("mutex poisoned")
    }

    /// Current events.
    pub fn events(&self) -> Vec<CalendarEvent> {
        self.state().events.clone()
    }

    /// Ids of the current events, in order.
    pub fn event_ids(&self) -> Vec<String> {
        self.state().events.iter().map(|e| e.id.clone()).collect()
    }

    fn with_event<T>(
        &self,
        event_id: &str,
        f: impl FnOnce(&mut CalendarEvent) -> T,
    ) -> Result<T> {
        let mut state = self.state();
        let event =
            state.events.iter_mut().find(|e| e.id == event_id).ok_or_else(|| not_found(event_id))?;
        Ok(f(event))
    }
}

fn not_found(event_id: &str) -> CalmateError {
    CalmateError::RemoteApi {
        status: 404,
        body: format!(r#"{{"error":{{"code":"ErrorItemNotFound","message":"{event_id}"}}}}"#),
    }
}

fn in_window(event: &CalendarEvent, window: &TimeWindow) -> bool {
    let starts = event.start.as_ref().is_some_and(|s| s.date_time.as_str() >= window.start.as_str());
    let ends = event.end.as_ref().is_some_and(|e| e.date_time.as_str() <= window.end.as_str());
    starts && ends
}

#[async_trait]
impl CalendarGateway for InMemoryCalendar {
    async fn create_event(&self, _token: &AccessToken, draft: &EventDraft) -> Result<CalendarEvent> {
        let mut state = self.state();
        state.next_id += 1;
        let event = CalendarEvent {
            id: format!("evt-new-{}", state.next_id),
            subject: Some(draft.subject.clone()),
            start: Some(DateTimeTimeZone::new(&draft.start, &draft.time_zone)),
            end: Some(DateTimeTimeZone::new(&draft.end, &draft.time_zone)),
            body: Some(ItemBody::html(&draft.body)),
            location: draft.location.as_ref().map(Location::named),
            attendees: draft.attendees.iter().map(Attendee::required).collect(),
            web_link: None,
        };
        state.events.push(event.clone());
        Ok(event)
    }

    async fn list_events(&self, _token: &AccessToken, window: &TimeWindow) -> Result<Vec<CalendarEvent>> {
        let mut events: Vec<_> =
            self.state().events.iter().filter(|e| in_window(e, window)).cloned().collect();
        events.sort_by(|a, b| {
            let key = |e: &CalendarEvent| e.start.as_ref().map(|s| s.date_time.clone());
            key(a).cmp(&key(b))
        });
        Ok(events)
    }

    async fn find_events_by_subject(
        &self,
        _token: &AccessToken,
        subject_prefix: &str,
        window: &TimeWindow,
    ) -> Result<Vec<CalendarEvent>> {
        let prefix = subject_prefix.to_lowercase();
        Ok(self
            .state()
            .events
            .iter()
            .filter(|e| e.subject.as_deref().is_some_and(|s| s.to_lowercase().starts_with(&prefix)))
            .filter(|e| in_window(e, window))
            .cloned()
            .collect())
    }

    async fn update_event(
        &self,
        _token: &AccessToken,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<CalendarEvent> {
        self.with_event(event_id, |event| {
            if let Some(subject) = &patch.subject {
                event.subject = Some(subject.clone());
            }
            if let Some(start) = &patch.start {
                event.start = Some(DateTimeTimeZone::new(start, &patch.time_zone));
            }
            if let Some(end) = &patch.end {
                event.end = Some(DateTimeTimeZone::new(end, &patch.time_zone));
            }
            if let Some(body) = &patch.body {
                event.body = Some(ItemBody::html(body));
            }
            if let Some(location) = &patch.location {
                event.location = Some(Location::named(location));
            }
            event.clone()
        })
    }

    async fn delete_event(&self, _token: &AccessToken, event_id: &str) -> Result<()> {
        let mut state = self.state();
        let before = state.events.len();
        state.events.retain(|e| e.id != event_id);
        if state.events.len() == before {
            return Err(not_found(event_id));
        }
        Ok(())
    }

    async fn delete_events(
        &self,
        token: &AccessToken,
        event_ids: &[String],
    ) -> Result<BulkDeleteSummary> {
        let mut summary = BulkDeleteSummary::default();
        for id in event_ids {
            match self.delete_event(token, id).await {
                Ok(()) => summary.deleted += 1,
                Err(_) => summary.failed += 1,
            }
        }
        Ok(summary)
    }

    async fn add_attendees(
        &self,
        _token: &AccessToken,
        event_id: &str,
        emails: &[String],
    ) -> Result<usize> {
        self.with_event(event_id, |event| {
            let mut added = 0;
            for email in emails {
                if !event.attendees.iter().any(|a| a.has_address(email)) {
                    event.attendees.push(Attendee::required(email.trim()));
                    added += 1;
                }
            }
            added
        })
    }

    async fn remove_attendees(
        &self,
        _token: &AccessToken,
        event_id: &str,
        emails: &[String],
    ) -> Result<usize> {
        self.with_event(event_id, |event| {
            let before = event.attendees.len();
            event.attendees.retain(|a| !emails.iter().any(|e| a.has_address(e)));
            before - event.attendees.len()
        })
    }

    async fn set_location(&self, _token: &AccessToken, event_id: &str, location: &str) -> Result<()> {
        self.with_event(event_id, |event| event.location = Some(Location::named(location)))
    }
}
