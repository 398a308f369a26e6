//! Integration tests for the authentication endpoints
//!
//! Drives the device-code sign-in through `POST /auth/token` the way a
//! client would: start, poll, then reuse the cached session.

mod support;

use std::time::Duration;

use axum::http::StatusCode;
use calmate_core::testing::{CLIENT_ID, USERNAME};
use calmate_core::DevicePoll;
use support::{test_app, TestRequest};
use tokio_test::assert_ok;

#[tokio::test]
async fn health_reports_service_name() {
    let app = test_app().build();

    let response = app.send(TestRequest::get("/health")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "outlook-calendar-agent");
}

#[tokio::test]
async fn device_flow_completes_across_calls() {
    let app = test_app().build();

    // First call: no cached account, so a device-code flow starts
    let first = app.send(TestRequest::post("/auth/token")).await;
    assert_eq!(first.status, StatusCode::OK);
    let body = first.json();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["user_code"], "ABCD-1234");
    assert_eq!(body["verification_uri"], "https://microsoft.com/devicelogin");
    let session_id = first.session_id();
    assert_eq!(body["session_id"], session_id.as_str());

    // Second call on the same session polls and completes
    app.provider.push_authorized_poll();
    let second = app.send(TestRequest::post("/auth/token").session(&session_id)).await;
    let body = second.json();
    assert_eq!(body["status"], "authenticated");
    assert_eq!(body["username"], USERNAME);
    assert!(body.get("access_token").is_none());

    // Third call reuses the cached session silently
    let third = app.send(TestRequest::post("/auth/token").session(&session_id)).await;
    assert_eq!(third.json()["status"], "authenticated");
    assert_eq!(app.provider.initiate_calls(), 1);
    assert_eq!(app.store.save_count(CLIENT_ID), 1);
}

#[tokio::test]
async fn separate_sessions_do_not_share_pending_flows() {
    let app = test_app().build();

    let a = app.send(TestRequest::post("/auth/token")).await;
    let b = app.send(TestRequest::post("/auth/token")).await;

    assert_ne!(a.session_id(), b.session_id());
    assert_eq!(app.provider.initiate_calls(), 2);
    assert_eq!(app.ctx.sessions.len(), 2);
}

#[tokio::test]
async fn expired_flow_reports_expired_then_restarts() {
    let app = test_app().build();

    let first = app.send(TestRequest::post("/auth/token")).await;
    let session_id = first.session_id();

    app.clock.advance(Duration::from_secs(901));
    let expired = app.send(TestRequest::post("/auth/token").session(&session_id)).await;
    assert_eq!(expired.json()["status"], "expired");

    let restarted = app.send(TestRequest::post("/auth/token").session(&session_id)).await;
    assert_eq!(restarted.json()["status"], "pending");
    assert_eq!(app.provider.initiate_calls(), 2);
}

#[tokio::test]
async fn denied_flow_carries_reason() {
    let app = test_app().build();
    let session_id = app.send(TestRequest::post("/auth/token")).await.session_id();

    app.provider.push_poll(DevicePoll::Denied("The user declined the sign-in".into()));
    let response = app.send(TestRequest::post("/auth/token").session(&session_id)).await;

    let body = response.json();
    assert_eq!(body["status"], "denied");
    assert_eq!(body["reason"], "The user declined the sign-in");
}

#[tokio::test]
async fn force_new_login_starts_flow_despite_cached_session() {
    let app = test_app().build();
    app.sign_in().await;

    let response = app.send(TestRequest::post("/auth/token?force_new_login=true")).await;

    assert_eq!(response.json()["status"], "pending");
    assert_eq!(app.provider.initiate_calls(), 1);
}

#[tokio::test]
async fn malformed_session_header_is_rejected() {
    let app = test_app().build();

    let response = app.send(TestRequest::post("/auth/token").session("not-a-uuid")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["type"], "invalid_input");
}

#[tokio::test]
async fn logout_clears_cache_and_is_idempotent() {
    let app = test_app().build();
    app.sign_in().await;
    app.send(TestRequest::post("/auth/token")).await;
    assert!(app.store.persisted(CLIENT_ID).is_some());

    let first = app.send(TestRequest::post("/auth/logout")).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json()["status"], "logged_out");
    assert!(app.store.persisted(CLIENT_ID).is_none());

    let second = app.send(TestRequest::post("/auth/logout")).await;
    assert_eq!(second.status, StatusCode::OK);
}

#[tokio::test]
async fn status_lists_cached_accounts_and_pending_flow() {
    let app = test_app().build();

    let before = app.send(TestRequest::get("/auth/status")).await.json();
    assert_eq!(before["signed_in"], false);
    assert_eq!(before["pending_flow"], false);

    let session_id = app.send(TestRequest::post("/auth/token")).await.session_id();
    let pending = app.send(TestRequest::get("/auth/status").session(&session_id)).await.json();
    assert_eq!(pending["pending_flow"], true);

    app.sign_in().await;
    let after = app.send(TestRequest::get("/auth/status")).await.json();
    assert_eq!(after["signed_in"], true);
    assert_eq!(after["accounts"][0]["username"], USERNAME);
}

#[tokio::test]
async fn status_does_not_allocate_sessions() {
    let app = test_app().build();
    let session_id = uuid::Uuid::new_v4().to_string();

    let response = app.send(TestRequest::get("/auth/status").session(&session_id)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(app.ctx.sessions.is_empty());
    assert_ok!(app.ctx.sessions.find(Some(&session_id)));
}

#[tokio::test]
async fn authenticated_requests_leave_no_session_behind() {
    let app = test_app().build();

    let session_id = app.send(TestRequest::post("/auth/token")).await.session_id();
    assert_eq!(app.ctx.sessions.len(), 1);

    app.provider.push_authorized_poll();
    let done = app.send(TestRequest::post("/auth/token").session(&session_id)).await;
    assert_eq!(done.json()["status"], "authenticated");
    assert!(app.ctx.sessions.is_empty());

    app.send(TestRequest::post("/auth/token")).await;
    let events = app
        .send(TestRequest::get("/events?start=2024-05-01T00:00:00&end=2024-05-02T00:00:00"))
        .await;
    assert_eq!(events.status, StatusCode::OK);
    assert!(app.ctx.sessions.is_empty());
}

#[tokio::test]
async fn logout_releases_pending_session() {
    let app = test_app().build();
    let session_id = app.send(TestRequest::post("/auth/token")).await.session_id();
    assert_eq!(app.ctx.sessions.len(), 1);

    let response = app.send(TestRequest::post("/auth/logout").session(&session_id)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(app.ctx.sessions.is_empty());
    let status = app.send(TestRequest::get("/auth/status").session(&session_id)).await.json();
    assert_eq!(status["pending_flow"], false);
}

#[tokio::test]
async fn abandoned_expired_flows_are_evicted() {
    let app = test_app().build();
    let abandoned = app.send(TestRequest::post("/auth/token")).await.session_id();

    app.clock.advance(Duration::from_secs(600));
    let live = app.send(TestRequest::post("/auth/token")).await.session_id();
    assert_eq!(app.ctx.sessions.len(), 2);

    app.clock.advance(Duration::from_secs(301));
    let fresh = app.send(TestRequest::post("/auth/token")).await;
    assert_eq!(fresh.json()["status"], "pending");

    assert!(app.ctx.sessions.find(Some(&abandoned)).unwrap().is_none());
    assert!(app.ctx.sessions.find(Some(&live)).unwrap().is_some());
    assert_eq!(app.ctx.sessions.len(), 2);
}
