use api::state::AppState;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
};
use chrono::{Duration, TimeZone, Utc};
use db::realtime::MemoryStore;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tower::ServiceExt;
use tower::util::BoxCloneService;
use util::clock::ManualClock;

pub type TestService = BoxCloneService<Request<Body>, Response, Infallible>;

/// A fresh app over an empty in-memory store, with the clock pinned to
/// 2025-01-15 09:00 UTC and a 20 minute auto-lock window.
pub struct TestApp {
    pub service: TestService,
    pub state: AppState,
    pub store: MemoryStore,
    pub clock: ManualClock,
}

impl TestApp {
    pub fn router(&self) -> Router {
        api::app(self.state.clone())
    }
}

pub fn make_test_app() -> TestApp {
    let store = MemoryStore::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap());
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        Duration::minutes(20),
    );
    let service = api::app(state.clone()).into_service().boxed_clone();

    TestApp {
        service,
        state,
        store,
        clock,
    }
}

/// Fire one request and decode the JSON envelope.
pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.service.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
