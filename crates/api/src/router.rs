//! Route table

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::commands::{agent, auth, calendar, health};
use crate::context::AppContext;

/// Routes of the HTTP shell over `ctx`.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/token", post(auth::get_token))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/status", get(auth::auth_status))
        .route("/invoke-agent", post(agent::invoke_agent))
        .route("/events", post(calendar::create_event).get(calendar::list_events))
        .route("/events/search", get(calendar::find_events))
        .route("/events/bulk-delete", post(calendar::bulk_delete))
        .route("/events/{id}", patch(calendar::update_event).delete(calendar::delete_event))
        .route(
            "/events/{id}/attendees",
            post(calendar::add_attendees).delete(calendar::remove_attendees),
        )
        .route("/events/{id}/location", put(calendar::set_location))
        .with_state(ctx)
}
