//! HTTP surface.
//!
//! | Method | Path         | Body                          | Success            |
//! |--------|--------------|-------------------------------|--------------------|
//! | GET    | `/`          |                               | redirect           |
//! | GET    | `/info`      |                               | status + size      |
//! | GET    | `/screencap` |                               | `image/jpeg` bytes |
//! | POST   | `/click`     | `{x, y}`                      | `{status: "ok"}`   |
//! | POST   | `/swipe`     | `{x1, y1, x2, y2, duration}`  | `{status: "ok"}`   |
//! | POST   | `/input`     | `{text}`                      | `{status: "ok"}`   |
//! | POST   | `/key`       | `{key}`                       | `{status: "ok"}`   |
//! | POST   | `/start`     |                               | `{status: "ok"}`   |
//! | POST   | `/exit`      |                               | `{status: "ok"}`   |
//!
//! Failures answer `{status: "error", message}` with 503 when the session
//! is not ready, 400 for a bad body, 409 for a conflicting start and 500
//! otherwise.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use cgbridge_core::{Bridge, BridgeError, BridgeInfo};

// ── Errors ───────────────────────────────────────────────────────

/// A `BridgeError` on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_precondition() => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::AlreadyInProgress => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            warn!("request failed: {}", self.0);
        } else {
            debug!(%status, "request rejected: {}", self.0);
        }
        let body = json!({ "status": "error", "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Parse a request body leniently: anything that is not JSON becomes
/// `null` and is rejected by validation after the readiness check.
fn body_json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

// ── Router ───────────────────────────────────────────────────────

pub fn router(bridge: Bridge) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/screencap", get(screencap))
        .route("/click", post(click))
        .route("/swipe", post(swipe))
        .route("/input", post(input))
        .route("/key", post(key))
        .route("/start", post(start))
        .route("/exit", post(exit))
        .with_state(bridge)
        .layer(TraceLayer::new_for_http())
}

// ── Handlers ─────────────────────────────────────────────────────

async fn root() -> Redirect {
    Redirect::permanent("/screencap")
}

async fn info(State(bridge): State<Bridge>) -> Json<BridgeInfo> {
    Json(bridge.info())
}

async fn screencap(State(bridge): State<Bridge>) -> ApiResult<Response> {
    let snap = bridge.screencap().await?;
    Ok(([(header::CONTENT_TYPE, snap.format.content_type())], snap.bytes).into_response())
}

async fn click(State(bridge): State<Bridge>, body: Bytes) -> ApiResult<Json<Value>> {
    bridge.click(&body_json(&body)).await?;
    Ok(ok())
}

async fn swipe(State(bridge): State<Bridge>, body: Bytes) -> ApiResult<Json<Value>> {
    bridge.swipe(&body_json(&body)).await?;
    Ok(ok())
}

async fn input(State(bridge): State<Bridge>, body: Bytes) -> ApiResult<Json<Value>> {
    bridge.input(&body_json(&body)).await?;
    Ok(ok())
}

async fn key(State(bridge): State<Bridge>, body: Bytes) -> ApiResult<Json<Value>> {
    bridge.key(&body_json(&body)).await?;
    Ok(ok())
}

async fn start(State(bridge): State<Bridge>) -> ApiResult<Json<Value>> {
    bridge.start().await?;
    Ok(ok())
}

async fn exit(State(bridge): State<Bridge>) -> Json<Value> {
    bridge.exit().await;
    ok()
}
