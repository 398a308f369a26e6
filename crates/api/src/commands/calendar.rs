//! Calendar endpoints
//!
//! Thin wrappers over the calendar gateway. Each handler first obtains a
//! token for the caller's session; without one it answers 401 with the
//! sign-in status instead of touching the calendar.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use calmate_domain::{CalendarEvent, EventDraft, EventPatch, TimeWindow};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ensure_token, session_header};
use crate::context::AppContext;
use crate::utils::api_error::ApiError;
use crate::utils::command_helpers::execute_command;

/// `?start=&end=` of `GET /events`
#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub start: String,
    pub end: String,
}

/// `?subject=&start=&end=` of `GET /events/search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub subject: String,
    pub start: String,
    pub end: String,
}

/// Body of `POST /events/bulk-delete`
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub event_ids: Vec<String>,
}

/// Body of the attendee endpoints
#[derive(Debug, Deserialize)]
pub struct AttendeesRequest {
    pub emails: Vec<String>,
}

/// Body of `PUT /events/{id}/location`
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub location: String,
}

/// Listing returned by the list and search endpoints
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub status: &'static str,
    pub count: usize,
    pub events: Vec<CalendarEvent>,
}

impl EventListResponse {
    fn new(events: Vec<CalendarEvent>) -> Self {
        Self { status: "success", count: events.len(), events }
    }
}

/// `POST /events` → `201`
pub async fn create_event(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(draft): Json<EventDraft>,
) -> Result<Response, ApiError> {
    execute_command("calendar::create_event", async {
        let auth = ensure_token(&ctx, &headers).await?;
        let event = ctx.calendar.create_event(&auth.token, &draft).await?;

        Ok((
            StatusCode::CREATED,
            session_header(auth.session_id),
            Json(json!({ "status": "success", "event": event })),
        )
            .into_response())
    })
    .await
}

/// `GET /events?start=..&end=..`
pub async fn list_events(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(params): Query<WindowParams>,
) -> Result<Response, ApiError> {
    execute_command("calendar::list_events", async {
        let auth = ensure_token(&ctx, &headers).await?;
        let window = TimeWindow::new(params.start, params.end);
        let events = ctx.calendar.list_events(&auth.token, &window).await?;

        Ok((session_header(auth.session_id), Json(EventListResponse::new(events))).into_response())
    })
    .await
}

/// `GET /events/search?subject=..&start=..&end=..`
pub async fn find_events(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    execute_command("calendar::find_events", async {
        let auth = ensure_token(&ctx, &headers).await?;
        let window = TimeWindow::new(params.start, params.end);
        let events =
            ctx.calendar.find_events_by_subject(&auth.token, &params.subject, &window).await?;

        Ok((session_header(auth.session_id), Json(EventListResponse::new(events))).into_response())
    })
    .await
}

/// `PATCH /events/{id}`
pub async fn update_event(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(patch): Json<EventPatch>,
) -> Result<Response, ApiError> {
    execute_command("calendar::update_event", async {
        let auth = ensure_token(&ctx, &headers).await?;
        let event = ctx.calendar.update_event(&auth.token, &event_id, &patch).await?;

        Ok((session_header(auth.session_id), Json(json!({ "status": "success", "event": event })))
            .into_response())
    })
    .await
}

/// `DELETE /events/{id}`
pub async fn delete_event(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Result<Response, ApiError> {
    execute_command("calendar::delete_event", async {
        let auth = ensure_token(&ctx, &headers).await?;
        ctx.calendar.delete_event(&auth.token, &event_id).await?;

        Ok((
            session_header(auth.session_id),
            Json(json!({ "status": "deleted", "event_id": event_id })),
        )
            .into_response())
    })
    .await
}

/// `POST /events/bulk-delete`
///
/// Per-event failures are counted, so this answers 200 even when some
/// deletions failed.
pub async fn bulk_delete(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Response, ApiError> {
    execute_command("calendar::bulk_delete", async {
        let auth = ensure_token(&ctx, &headers).await?;
        let summary = ctx.calendar.delete_events(&auth.token, &request.event_ids).await?;

        Ok((
            session_header(auth.session_id),
            Json(json!({
                "status": "success",
                "deleted": summary.deleted,
                "failed": summary.failed,
            })),
        )
            .into_response())
    })
    .await
}

/// `POST /events/{id}/attendees`
pub async fn add_attendees(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(request): Json<AttendeesRequest>,
) -> Result<Response, ApiError> {
    execute_command("calendar::add_attendees", async {
        let auth = ensure_token(&ctx, &headers).await?;
        let added = ctx.calendar.add_attendees(&auth.token, &event_id, &request.emails).await?;

        Ok((session_header(auth.session_id), Json(json!({ "status": "success", "added": added })))
            .into_response())
    })
    .await
}

/// `DELETE /events/{id}/attendees` with a JSON body
pub async fn remove_attendees(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(request): Json<AttendeesRequest>,
) -> Result<Response, ApiError> {
    execute_command("calendar::remove_attendees", async {
        let auth = ensure_token(&ctx, &headers).await?;
        let removed =
            ctx.calendar.remove_attendees(&auth.token, &event_id, &request.emails).await?;

        Ok((
            session_header(auth.session_id),
            Json(json!({ "status": "success", "removed": removed })),
        )
            .into_response())
    })
    .await
}

/// `PUT /events/{id}/location`
pub async fn set_location(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(request): Json<LocationRequest>,
) -> Result<Response, ApiError> {
    execute_command("calendar::set_location", async {
        let auth = ensure_token(&ctx, &headers).await?;
        ctx.calendar.set_location(&auth.token, &event_id, &request.location).await?;

        Ok((
            session_header(auth.session_id),
            Json(json!({ "status": "success", "location": request.location })),
        )
            .into_response())
    })
    .await
}
