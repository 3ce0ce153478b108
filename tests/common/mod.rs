use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use promo_registry::{
    config::AppConfig,
    events::{self, EventSender},
    logging::{self, LoggerConfig, LoggingState},
    store::{InMemoryStore, SettingsStore},
    AppState,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Helper harness for spinning up an application state backed by an
/// in-memory settings store.
pub struct TestApp {
    router: Router,
    #[allow(dead_code)]
    pub state: Arc<AppState>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh store state.
    pub async fn new() -> Self {
        // Minimal configuration suitable for tests.
        let cfg = AppConfig::new("127.0.0.1".to_string(), 18_080, "test".to_string());

        let store: Arc<dyn SettingsStore> = Arc::new(InMemoryStore::new());

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = Arc::new(AppState::new(cfg, event_sender, store));
        state
            .discounts
            .declare()
            .await
            .expect("declare registry key for tests");

        let logger = logging::setup_logger(LoggerConfig {
            async_buffer_size: 128, // Smaller buffer for tests
            use_color: false,       // No color in test output
        });
        let logging_state = Arc::new(LoggingState::new(logger));

        let router = promo_registry::app_router(state.clone(), logging_state);

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Send a JSON request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Read a response body as JSON.
pub async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("response body is not valid json")
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
