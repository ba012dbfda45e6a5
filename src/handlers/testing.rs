use crate::{router, Health, Settings};
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    response::Response,
    Router,
};
use database::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// The router backed by an in-memory store
pub(crate) struct App {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl App {
    pub fn new() -> Self {
        Self::with(Health::new(), Settings::default())
    }

    pub fn with(health: Health, settings: Settings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = router(store.clone(), health, settings);
        App { router, store }
    }

    /// Send a request and decode the JSON response
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.raw(method, uri, body).await;
        let status = response.status();

        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap();

        (status, body)
    }

    /// Send a request without decoding the response
    pub async fn raw(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }
}
