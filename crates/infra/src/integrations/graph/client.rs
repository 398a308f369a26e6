//! Graph calendar client

use std::time::Duration;

use async_trait::async_trait;
use calmate_core::CalendarGateway;
use calmate_domain::{
    AccessToken, Attendee, BulkDeleteSummary, CalendarEvent, CalmateError, EventDraft,
    EventPatch, GraphConfig, Location, Result, TimeWindow,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use super::payloads::{AttendeesBody, EventCollection, EventPatchBody, LocationBody, NewEventBody};
use crate::http::HttpClient;

const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;

/// Calendar gateway backed by Microsoft Graph
#[derive(Clone)]
pub struct GraphCalendarClient {
    http: HttpClient,
    base_url: Url,
}

impl GraphCalendarClient {
    /// `base_url` is the API root, e.g. `https://graph.microsoft.com/v1.0`.
    ///
    /// # Errors
    /// `Config` when `base_url` is not an absolute URL.
    pub fn new(http: HttpClient, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            CalmateError::Config(format!("Invalid calendar API base URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CalmateError::Config(format!(
                "Calendar API base URL cannot carry paths: {base_url}"
            )));
        }
        Ok(Self { http, base_url })
    }

    /// Single-attempt client with the configured timeout.
    pub fn from_config(config: &GraphConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(1)
            .build()?;
        Self::new(http, &config.base_url)
    }

    /// `{base}/me/events[/{id}]`, with the id percent-encoded as one segment.
    fn events_url(&self, event_id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["me", "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url, token: &AccessToken) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(token.secret())
            .header("Prefer", OUTLOOK_TIMEZONE_HEADER)
    }

    async fn send(&self, builder: RequestBuilder, expected: StatusCode) -> Result<Response> {
        self.http.send_expecting(builder, expected).await
    }

    async fn get_event(&self, token: &AccessToken, event_id: &str) -> Result<CalendarEvent> {
        let request = self.request(Method::GET, self.events_url(Some(event_id)), token);
        let response = self.send(request, StatusCode::OK).await?;
        parse_json(response).await
    }

    async fn list_with_filter(
        &self,
        token: &AccessToken,
        filter: String,
        ordered: bool,
    ) -> Result<Vec<CalendarEvent>> {
        let mut query = vec![("$filter", filter)];
        if ordered {
            query.push(("$orderby", "start/dateTime".to_string()));
        }
        let request = self.request(Method::GET, self.events_url(None), token).query(&query);
        let response = self.send(request, StatusCode::OK).await?;
        let collection: EventCollection = parse_json(response).await?;
        Ok(collection.value)
    }

    async fn write_attendees(
        &self,
        token: &AccessToken,
        event_id: &str,
        attendees: &[Attendee],
    ) -> Result<()> {
        let request = self
            .request(Method::PATCH, self.events_url(Some(event_id)), token)
            .json(&AttendeesBody { attendees });
        self.send(request, StatusCode::OK).await?;
        Ok(())
    }
}

/// OData string literal with embedded single quotes doubled.
fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn window_filter(window: &TimeWindow) -> String {
    format!(
        "start/dateTime ge {} and end/dateTime le {}",
        odata_literal(&window.start),
        odata_literal(&window.end)
    )
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| CalmateError::InvalidInput(format!("Failed to parse calendar response: {e}")))
}

#[async_trait]
impl CalendarGateway for GraphCalendarClient {
    async fn create_event(&self, token: &AccessToken, draft: &EventDraft) -> Result<CalendarEvent> {
        let request = self
            .request(Method::POST, self.events_url(None), token)
            .json(&NewEventBody::from(draft));
        let response = self.send(request, StatusCode::CREATED).await?;
        let event: CalendarEvent = parse_json(response).await?;
        info!(event_id = %event.id, "calendar event created");
        Ok(event)
    }

    async fn list_events(
        &self,
        token: &AccessToken,
        window: &TimeWindow,
    ) -> Result<Vec<CalendarEvent>> {
        let events = self.list_with_filter(token, window_filter(window), true).await?;
        debug!(count = events.len(), "listed calendar events");
        Ok(events)
    }

    async fn find_events_by_subject(
        &self,
        token: &AccessToken,
        subject_prefix: &str,
        window: &TimeWindow,
    ) -> Result<Vec<CalendarEvent>> {
        let filter = format!(
            "startsWith(subject, {}) and {}",
            odata_literal(subject_prefix),
            window_filter(window)
        );
        let events = self.list_with_filter(token, filter, false).await?;
        debug!(count = events.len(), "found calendar events by subject");
        Ok(events)
    }

    async fn update_event(
        &self,
        token: &AccessToken,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<CalendarEvent> {
        let request = self
            .request(Method::PATCH, self.events_url(Some(event_id)), token)
            .json(&EventPatchBody::from(patch));
        let response = self.send(request, StatusCode::OK).await?;
        debug!(event_id, "calendar event updated");
        parse_json(response).await
    }

    async fn delete_event(&self, token: &AccessToken, event_id: &str) -> Result<()> {
        let request = self.request(Method::DELETE, self.events_url(Some(event_id)), token);
        self.send(request, StatusCode::NO_CONTENT).await?;
        info!(event_id, "calendar event deleted");
        Ok(())
    }

    async fn delete_events(
        &self,
        token: &AccessToken,
        event_ids: &[String],
    ) -> Result<BulkDeleteSummary> {
        let mut summary = BulkDeleteSummary::default();
        for event_id in event_ids {
            match self.delete_event(token, event_id).await {
                Ok(()) => summary.deleted += 1,
                Err(err) => {
                    warn!(event_id = %event_id, error = %err, "bulk delete: event not deleted");
                    summary.failed += 1;
                }
            }
        }
        info!(deleted = summary.deleted, failed = summary.failed, "bulk delete finished");
        Ok(summary)
    }

    async fn add_attendees(
        &self,
        token: &AccessToken,
        event_id: &str,
        emails: &[String],
    ) -> Result<usize> {
        let mut attendees = self.get_event(token, event_id).await?.attendees;
        let before = attendees.len();
        for email in emails {
            let email = email.trim();
            if !email.is_empty() && !attendees.iter().any(|a| a.has_address(email)) {
                attendees.push(Attendee::required(email));
            }
        }
        let added = attendees.len() - before;

        self.write_attendees(token, event_id, &attendees).await?;
        debug!(event_id, added, "attendees added");
        Ok(added)
    }

    async fn remove_attendees(
        &self,
        token: &AccessToken,
        event_id: &str,
        emails: &[String],
    ) -> Result<usize> {
        let mut attendees = self.get_event(token, event_id).await?.attendees;
        let before = attendees.len();
        attendees.retain(|a| !emails.iter().any(|email| a.has_address(email)));
        let removed = before - attendees.len();

        self.write_attendees(token, event_id, &attendees).await?;
        debug!(event_id, removed, "attendees removed");
        Ok(removed)
    }

    async fn set_location(&self, token: &AccessToken, event_id: &str, location: &str) -> Result<()> {
        let request = self
            .request(Method::PATCH, self.events_url(Some(event_id)), token)
            .json(&LocationBody { location: Location::named(location) });
        self.send(request, StatusCode::OK).await?;
        debug!(event_id, "event location updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn token() -> AccessToken {
        AccessToken::new("graph-token", Utc::now() + chrono::Duration::hours(1), None)
    }

    fn client(server: &MockServer) -> GraphCalendarClient {
        let http = HttpClient::builder().max_attempts(1).build().expect("http client");
        GraphCalendarClient::new(http, &format!("{}/v1.0", server.uri())).expect("client")
    }

    fn event_json(id: &str, subject: &str, start: &str) -> serde_json::Value {
        json!({
            "id": id,
            "subject": subject,
            "start": {"dateTime": start, "timeZone": "UTC"},
            "end": {"dateTime": start, "timeZone": "UTC"},
            "attendees": []
        })
    }

    fn window() -> TimeWindow {
        TimeWindow::new("2026-03-02T00:00:00", "2026-03-09T00:00:00")
    }

    #[test]
    fn odata_literals_double_single_quotes() {
        assert_eq!(odata_literal("Bob's 1:1"), "'Bob''s 1:1'");
    }

    #[test]
    fn event_ids_are_a_single_encoded_segment() {
        let http = HttpClient::builder().build().expect("http client");
        let client = GraphCalendarClient::new(http, "https://graph.microsoft.com/v1.0/").unwrap();

        let url = client.events_url(Some("AAMk/AGI=="));
        assert_eq!(url.as_str(), "https://graph.microsoft.com/v1.0/me/events/AAMk%2FAGI==");
    }

    #[tokio::test]
    async fn create_event_expects_201_and_returns_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/events"))
            .and(header("Authorization", "Bearer graph-token"))
            .and(header("Prefer", r#"outlook.timezone="UTC""#))
            .and(body_json(json!({
                "subject": "Planning",
                "start": {"dateTime": "2026-03-02T09:00:00", "timeZone": "UTC"},
                "end": {"dateTime": "2026-03-02T10:00:00", "timeZone": "UTC"},
                "attendees": [],
                "body": {"contentType": "HTML", "content": ""},
                "location": {"displayName": "Room 4"}
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(event_json("evt-1", "Planning", "2026-03-02T09:00:00")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let draft = EventDraft {
            subject: "Planning".into(),
            start: "2026-03-02T09:00:00".into(),
            end: "2026-03-02T10:00:00".into(),
            time_zone: "UTC".into(),
            attendees: vec![],
            body: String::new(),
            location: Some("Room 4".into()),
        };
        let event = client(&server).create_event(&token(), &draft).await.unwrap();

        assert_eq!(event.id, "evt-1");
    }

    #[tokio::test]
    async fn create_event_surfaces_remote_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/events"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"bad start"}"#))
            .mount(&server)
            .await;

        let draft = EventDraft {
            subject: "x".into(),
            start: "nope".into(),
            end: "nope".into(),
            time_zone: "UTC".into(),
            attendees: vec![],
            body: String::new(),
            location: None,
        };
        let err = client(&server).create_event(&token(), &draft).await.unwrap_err();

        assert_eq!(
            err,
            CalmateError::RemoteApi { status: 400, body: r#"{"error":"bad start"}"#.into() }
        );
    }

    #[tokio::test]
    async fn list_events_filters_window_and_orders_by_start() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/events"))
            .and(query_param(
                "$filter",
                "start/dateTime ge '2026-03-02T00:00:00' and end/dateTime le '2026-03-09T00:00:00'",
            ))
            .and(query_param("$orderby", "start/dateTime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(1)
            .mount(&server)
            .await;

        let events = client(&server).list_events(&token(), &window()).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn find_by_subject_keeps_service_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/events"))
            .and(query_param(
                "$filter",
                "startsWith(subject, 'Team') and start/dateTime ge '2026-03-02T00:00:00' \
                 and end/dateTime le '2026-03-09T00:00:00'",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    event_json("evt-2", "Team Sync", "2026-03-04T09:00:00"),
                    event_json("evt-1", "Team Offsite", "2026-03-03T09:00:00")
                ]
            })))
            .mount(&server)
            .await;

        let events =
            client(&server).find_events_by_subject(&token(), "Team", &window()).await.unwrap();

        let subjects: Vec<_> = events.iter().map(CalendarEvent::subject_or_default).collect();
        assert_eq!(subjects, ["Team Sync", "Team Offsite"]);
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests[0].url.query_pairs().all(|(k, _)| k != "$orderby"));
    }

    #[tokio::test]
    async fn update_sends_only_supplied_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1.0/me/events/evt-1"))
            .and(body_json(json!({"subject": "Renamed"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(event_json("evt-1", "Renamed", "2026-03-02T09:00:00")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let patch = EventPatch { subject: Some("Renamed".into()), ..EventPatch::default() };
        let event = client(&server).update_event(&token(), "evt-1", &patch).await.unwrap();

        assert_eq!(event.subject.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn delete_unknown_event_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1.0/me/events/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("ErrorItemNotFound"))
            .mount(&server)
            .await;

        let err = client(&server).delete_event(&token(), "missing").await.unwrap_err();
        assert!(matches!(err, CalmateError::RemoteApi { status: 404, .. }));
    }

    #[tokio::test]
    async fn bulk_delete_counts_successes_and_failures() {
        let server = MockServer::start().await;
        for id in ["a", "c"] {
            Mock::given(method("DELETE"))
                .and(path(format!("/v1.0/me/events/{id}")))
                .respond_with(ResponseTemplate::new(204))
                .mount(&server)
                .await;
        }
        Mock::given(method("DELETE"))
            .and(path("/v1.0/me/events/b"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let summary = client(&server).delete_events(&token(), &ids).await.unwrap();

        assert_eq!(summary, BulkDeleteSummary { deleted: 2, failed: 1 });
    }

    #[tokio::test]
    async fn add_attendees_appends_new_addresses_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/events/evt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt-1",
                "attendees": [
                    {"emailAddress": {"address": "Ada@Contoso.com", "name": "Ada"}, "type": "optional"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v1.0/me/events/evt-1"))
            .and(body_json(json!({
                "attendees": [
                    {"emailAddress": {"address": "Ada@Contoso.com", "name": "Ada"}, "type": "optional"},
                    {"emailAddress": {"address": "bob@contoso.com"}, "type": "required"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let emails = vec!["ada@contoso.com".to_string(), "bob@contoso.com".to_string()];
        let added = client(&server).add_attendees(&token(), "evt-1", &emails).await.unwrap();

        assert_eq!(added, 1);
    }

    #[tokio::test]
    async fn remove_attendees_matches_case_insensitively() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/events/evt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt-1",
                "attendees": [
                    {"emailAddress": {"address": "ada@contoso.com"}, "type": "required"},
                    {"emailAddress": {"address": "bob@contoso.com"}, "type": "required"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v1.0/me/events/evt-1"))
            .and(body_json(json!({
                "attendees": [{"emailAddress": {"address": "bob@contoso.com"}, "type": "required"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let emails = vec!["ADA@contoso.com".to_string(), "zed@contoso.com".to_string()];
        let removed = client(&server).remove_attendees(&token(), "evt-1", &emails).await.unwrap();

        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn failed_read_aborts_attendee_write() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/events/evt-1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let emails = vec!["bob@contoso.com".to_string()];
        let err = client(&server).add_attendees(&token(), "evt-1", &emails).await.unwrap_err();

        assert!(matches!(err, CalmateError::RemoteApi { status: 404, .. }));
    }

    #[tokio::test]
    async fn set_location_patches_display_name() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1.0/me/events/evt-1"))
            .and(body_json(json!({"location": {"displayName": "Room 12"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-1"})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).set_location(&token(), "evt-1", "Room 12").await.unwrap();
    }
}
