//! Shared harness for the HTTP integration tests
//!
//! Builds the router over in-memory doubles and drives it with
//! `tower::ServiceExt::oneshot`, without binding a socket.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use calmate_core::testing::{
    InMemoryCalendar, InMemoryTokenCacheStore, MockClock, ScriptedIdentityProvider,
    ScriptedLanguageModel, CLIENT_ID,
};
use calmate_core::{
    AuthService, CalendarAgent, CalendarToolbox, Clock, CredentialResolver, SecretSource,
    TokenCacheStore,
};
use calmate_domain::{CalendarEvent, Config, DateTimeTimeZone};
use calmate_lib::{build_router, AppContext};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

pub const SESSION_HEADER: &str = "x-calmate-session";

/// Router plus handles on every double behind it
pub struct TestApp {
    pub router: Router,
    pub ctx: Arc<AppContext>,
    pub provider: Arc<ScriptedIdentityProvider>,
    pub store: Arc<InMemoryTokenCacheStore>,
    pub calendar: Arc<InMemoryCalendar>,
    pub model: Arc<ScriptedLanguageModel>,
    pub clock: Arc<MockClock>,
}

pub struct TestAppBuilder {
    events: Vec<CalendarEvent>,
    with_agent: bool,
}

impl TestAppBuilder {
    pub fn events(mut self, events: Vec<CalendarEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn without_agent(mut self) -> Self {
        self.with_agent = false;
        self
    }

    pub fn build(self) -> TestApp {
        let provider = Arc::new(ScriptedIdentityProvider::new());
        let store = Arc::new(InMemoryTokenCacheStore::new());
        let calendar = Arc::new(InMemoryCalendar::with_events(self.events));
        let model = Arc::new(ScriptedLanguageModel::new());
        let clock = Arc::new(MockClock::new());

        let env: Arc<dyn SecretSource> =
            Arc::new(HashMap::from([("CLIENT_ID".to_string(), CLIENT_ID.to_string())]));
        let auth = AuthService::new(
            provider.clone(),
            store.clone(),
            CredentialResolver::new(env),
            clock.clone(),
        );

        let agent = self.with_agent.then(|| {
            Arc::new(CalendarAgent::new(
                model.clone(),
                CalendarToolbox::new(calendar.clone()),
                clock.clone(),
            ))
        });

        let ctx = Arc::new(AppContext::from_parts(
            Config::default(),
            Arc::new(auth),
            calendar.clone(),
            agent,
            clock.clone(),
        ));

        TestApp { router: build_router(ctx.clone()), ctx, provider, store, calendar, model, clock }
    }
}

pub fn test_app() -> TestAppBuilder {
    TestAppBuilder { events: Vec::new(), with_agent: true }
}

impl TestApp {
    /// Put a signed-in account with a valid token into the cache.
    pub async fn sign_in(&self) {
        let cache = self.store.load(CLIENT_ID).await.expect("load cache");
        let mut guard = cache.lock().await;
        self.provider.seed_account(&mut guard, self.clock.now());
    }

    pub async fn send(&self, request: TestRequest) -> TestResponse {
        request.send(self.router.clone()).await
    }
}

pub fn event(id: &str, subject: &str, start: &str, end: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        subject: Some(subject.to_string()),
        start: Some(DateTimeTimeZone::new(start, "UTC")),
        end: Some(DateTimeTimeZone::new(end, "UTC")),
        body: None,
        location: None,
        attendees: Vec::new(),
        web_link: None,
    }
}

/// Request builder for one-shot calls against the router
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl TestRequest {
    fn new(method: Method, uri: &str) -> Self {
        Self { method, uri: uri.to_owned(), headers: Vec::new(), body: None }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn patch(uri: &str) -> Self {
        Self::new(Method::PATCH, uri)
    }

    pub fn put(uri: &str) -> Self {
        Self::new(Method::PUT, uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn session(self, session_id: &str) -> Self {
        self.header(SESSION_HEADER, session_id)
    }

    pub fn json<T: Serialize>(mut self, data: &T) -> Self {
        self.body = Some(serde_json::to_string(data).expect("Failed to serialize JSON"));
        self.headers
            .push((header::CONTENT_TYPE.as_str().to_owned(), "application/json".to_owned()));
        self
    }

    pub async fn send(self, app: Router) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }

        let request =
            builder.body(Body::from(self.body.unwrap_or_default())).expect("Failed to build request");
        let response = app.oneshot(request).await.expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes =
            to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read response body");

        TestResponse { status, headers, body: bytes.to_vec() }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    pub fn session_id(&self) -> String {
        self.headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .expect("response carries a session header")
            .to_string()
    }
}
