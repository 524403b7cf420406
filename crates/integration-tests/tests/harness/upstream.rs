//! Programmable mock upstream
//!
//! Answers any method and path with a canned JSON body or an event stream and
//! records every request it receives.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Canned reply for one route
#[derive(Debug, Clone)]
pub enum Reply {
    Json {
        status: StatusCode,
        body: Value,
        delay: Duration,
    },
    Events {
        frames: Vec<String>,
        delay: Duration,
    },
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self::Json {
            status: StatusCode::OK,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: StatusCode, body: Value) -> Self {
        Self::Json {
            status,
            body,
            delay: Duration::ZERO,
        }
    }

    /// Raw body pieces, each written as its own chunk
    pub fn events(frames: Vec<String>) -> Self {
        Self::Events {
            frames,
            delay: Duration::from_millis(5),
        }
    }

    /// `data:` frames for each payload followed by `[DONE]`
    pub fn sse(payloads: &[Value]) -> Self {
        let mut frames: Vec<String> = payloads.iter().map(|p| format!("data: {p}\n\n")).collect();
        frames.push("data: [DONE]\n\n".to_owned());
        Self::events(frames)
    }

    /// Named events with no terminator, as the Messages API sends them
    pub fn named_sse(events: &[Value]) -> Self {
        let frames = events
            .iter()
            .map(|e| format!("event: {}\ndata: {e}\n\n", e["type"].as_str().unwrap_or("message")))
            .collect();
        Self::events(frames)
    }

    /// Delay before a JSON reply, or between stream frames
    #[must_use]
    pub fn delayed(self, by: Duration) -> Self {
        match self {
            Self::Json { status, body, .. } => Self::Json { status, body, delay: by },
            Self::Events { frames, .. } => Self::Events { frames, delay: by },
        }
    }
}

/// One request seen by the mock
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Default)]
struct UpstreamState {
    routes: Mutex<HashMap<(Method, String), Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<UpstreamState>,
}

impl MockUpstream {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(UpstreamState::default());
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

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

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL with a path prefix such as `/v1`
    pub fn base_url(&self, prefix: &str) -> Url {
        Url::parse(&format!("http://{}{prefix}", self.addr)).unwrap()
    }

    pub fn on_get(&self, path: &str, reply: Reply) -> &Self {
        self.route(Method::GET, path, reply)
    }

    pub fn on_post(&self, path: &str, reply: Reply) -> &Self {
        self.route(Method::POST, path, reply)
    }

    fn route(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.state.routes.lock().unwrap().insert((method, path.to_owned()), reply);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request recorded")
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(
    State(state): State<Arc<UpstreamState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let reply = state
        .routes
        .lock()
        .unwrap()
        .get(&(method.clone(), uri.path().to_owned()))
        .cloned();

    state.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    match reply {
        None => (StatusCode::NOT_FOUND, "no route").into_response(),
        Some(Reply::Json { status, body, delay }) => {
            tokio::time::sleep(delay).await;
            (status, Json(body)).into_response()
        }
        Some(Reply::Events { frames, delay }) => {
            let stream = futures_util::stream::iter(frames).then(move |frame| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, Infallible>(Bytes::from(frame))
            });
            ([(header::CONTENT_TYPE, "text/event-stream")], Body::from_stream(stream)).into_response()
        }
    }
}
