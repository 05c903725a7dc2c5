//! Mock inference server for integration tests
//!
//! Implements the OpenAI-compatible subset the HTTP engine speaks and
//! records every completion request it receives

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::StreamExt as _;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Model the mock server advertises
pub const MOCK_MODEL: &str = "mock-model-1";

/// How the mock answers streaming requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamBehavior {
    /// Role chunk, one chunk per word, finish chunk, usage chunk, `[DONE]`
    Complete,
    /// One content chunk, then an in-band error body
    FailMidway,
    /// One content chunk, a truncated chunk, then a normal finish
    Malformed,
    /// One content chunk, then stay open until the client disconnects
    Stall,
}

/// Mock engine server with predictable responses
pub struct MockEngine {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    completion_count: AtomicU32,
    model_list_count: AtomicU32,
    /// Number of completion requests to fail before succeeding
    fail_count: AtomicU32,
    /// Fail with a plain-text body instead of the structured error schema
    plain_failures: bool,
    response_content: String,
    stream_behavior: StreamBehavior,
    requests: Mutex<Vec<Value>>,
    authorization: Mutex<Vec<Option<String>>>,
    stream_closed: CancellationToken,
}

/// Builder for [`MockEngine`]
pub struct MockEngineBuilder {
    fail_count: u32,
    plain_failures: bool,
    response_content: String,
    stream_behavior: StreamBehavior,
}

impl MockEngineBuilder {
    /// Fail the first `n` completion requests with a structured 500
    pub fn failing(mut self, n: u32) -> Self {
        self.fail_count = n;
        self
    }

    /// Fail the first `n` completion requests with a plain-text 502
    pub fn failing_plain(mut self, n: u32) -> Self {
        self.fail_count = n;
        self.plain_failures = true;
        self
    }

    /// Reply with this content
    pub fn with_response(mut self, content: &str) -> Self {
        content.clone_into(&mut self.response_content);
        self
    }

    /// Change how streaming requests are answered
    pub fn with_stream_behavior(mut self, behavior: StreamBehavior) -> Self {
        self.stream_behavior = behavior;
        self
    }

    /// Start the mock server, returning immediately
    pub async fn start(self) -> anyhow::Result<MockEngine> {
        let state = Arc::new(MockState {
            completion_count: AtomicU32::new(0),
            model_list_count: AtomicU32::new(0),
            fail_count: AtomicU32::new(self.fail_count),
            plain_failures: self.plain_failures,
            response_content: self.response_content,
            stream_behavior: self.stream_behavior,
            requests: Mutex::new(Vec::new()),
            authorization: Mutex::new(Vec::new()),
            stream_closed: CancellationToken::new(),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .route("/v1/models", routing::get(handle_models))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(MockEngine { addr, shutdown, state })
    }
}

impl MockEngine {
    /// Builder with default behavior
    pub fn builder() -> MockEngineBuilder {
        MockEngineBuilder {
            fail_count: 0,
            plain_failures: false,
            response_content: "Hello from mock engine".to_owned(),
            stream_behavior: StreamBehavior::Complete,
        }
    }

    /// Start a mock server with default behavior
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    /// Base URL for the engine configuration
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of completion requests received
    pub fn completion_count(&self) -> u32 {
        self.state.completion_count.load(Ordering::Relaxed)
    }

    /// Number of model list requests received
    pub fn model_list_count(&self) -> u32 {
        self.state.model_list_count.load(Ordering::Relaxed)
    }

    /// Bodies of all completion requests received, in order
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    /// `Authorization` headers of all completion requests received
    pub fn authorization(&self) -> Vec<Option<String>> {
        self.state.authorization.lock().unwrap().clone()
    }

    /// Wait until a stalled stream is dropped by the client
    pub async fn wait_for_stream_close(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.state.stream_closed.cancelled())
            .await
            .is_ok()
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Handlers --

async fn handle_models(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    state.model_list_count.fetch_add(1, Ordering::Relaxed);

    Json(json!({
        "object": "list",
        "data": [{"id": MOCK_MODEL, "object": "model", "owned_by": "mock"}]
    }))
}

async fn handle_chat_completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(req): Json<Value>,
) -> Response {
    state.completion_count.fetch_add(1, Ordering::Relaxed);
    state.requests.lock().unwrap().push(req.clone());
    state.authorization.lock().unwrap().push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    );

    // If fail_count > 0, decrement and fail
    let remaining = state.fail_count.load(Ordering::Relaxed);
    if remaining > 0 {
        state.fail_count.fetch_sub(1, Ordering::Relaxed);
        if state.plain_failures {
            return (StatusCode::BAD_GATEWAY, "upstream overloaded").into_response();
        }
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": {
                    "message": "mock engine intentional failure",
                    "type": "server_error",
                    "param": null,
                    "code": 500
                }
            })),
        )
            .into_response();
    }

    let model = req["model"].as_str().unwrap_or(MOCK_MODEL).to_owned();

    if req["stream"].as_bool().unwrap_or(false) {
        return streaming_response(&state, &model);
    }

    let logprobs = req["logprobs"].as_bool().unwrap_or(false).then(|| {
        json!({"content": [{
            "token": "Hello",
            "logprob": -0.25,
            "top_logprobs": [{"token": "Hello", "logprob": -0.25}, {"token": "Hi", "logprob": -1.5}]
        }]})
    });

    Json(json!({
        "id": "chatcmpl-test-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": state.response_content},
            "finish_reason": "stop",
            "logprobs": logprobs
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }))
    .into_response()
}

fn chunk(model: &str, delta: Value, finish_reason: Option<&str>) -> String {
    let chunk = json!({
        "id": "chatcmpl-test-stream",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
    });
    format!("data: {chunk}\n\n")
}

/// Build an SSE streaming response
fn streaming_response(state: &Arc<MockState>, model: &str) -> Response {
    let sse = |body: Body| {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/event-stream")],
            body,
        )
            .into_response()
    };

    let first = chunk(model, json!({"role": "assistant", "content": ""}), None);

    match state.stream_behavior {
        StreamBehavior::Complete => {
            let mut body = first;
            for word in state.response_content.split_whitespace() {
                body.push_str(&chunk(model, json!({"content": format!("{word} ")}), None));
            }
            body.push_str(&chunk(model, json!({}), Some("stop")));

            let usage = json!({
                "id": "chatcmpl-test-stream",
                "object": "chat.completion.chunk",
                "created": 1_700_000_000,
                "model": model,
                "choices": [],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            });
            body.push_str(&format!("data: {usage}\n\n"));
            body.push_str("data: [DONE]\n\n");

            sse(Body::from(body))
        }
        StreamBehavior::FailMidway => {
            let mut body = first;
            body.push_str(&chunk(model, json!({"content": "partial"}), None));
            body.push_str("data: {\"error\":{\"message\":\"engine ran out of memory\",\"type\":\"engine_error\"}}\n\n");

            sse(Body::from(body))
        }
        StreamBehavior::Malformed => {
            let mut body = first;
            body.push_str(&chunk(model, json!({"content": "partial"}), None));
            body.push_str("data: {\"id\":\"chatcmpl-test-stream\",\"choices\":[{\"delta\":{\"content\":\"lost\"\n\n");
            body.push_str(&chunk(model, json!({"content": " tail"}), Some("stop")));
            body.push_str("data: [DONE]\n\n");

            sse(Body::from(body))
        }
        StreamBehavior::Stall => {
            let opening = format!("{first}{}", chunk(model, json!({"content": "partial"}), None));
            let guard = StreamCloseGuard(state.stream_closed.clone());

            let events = futures_util::stream::once(async move { Ok::<_, std::io::Error>(opening) })
                .chain(futures_util::stream::pending())
                .map(move |item| {
                    let _held = &guard;
                    item
                });

            sse(Body::from_stream(events))
        }
    }
}

/// Signals when the response body is dropped by the server
struct StreamCloseGuard(CancellationToken);

impl Drop for StreamCloseGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
