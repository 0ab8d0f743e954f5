//! Request façade.
//!
//! Every input or snapshot request runs the same pipeline:
//!
//! 1. readiness check: the session is `Live` with an open channel,
//! 2. body validation,
//! 3. encode and transmit (input) or fetch and encode (snapshot).
//!
//! A request against a session that is not ready fails with a precondition
//! error even when its body is also invalid.

use std::sync::Arc;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::collab::{Collaborators, ImageEncoder};
use crate::error::BridgeError;
use crate::frame::ImageFormat;
use crate::input::encoder::{InputEncoder, PacedCommand};
use crate::input::ids::CommandIds;
use crate::session::{LiveSession, SessionConfig, SessionController};

/// Longest accepted swipe, in milliseconds.
pub const MAX_SWIPE_DURATION_MS: i64 = 60_000;

// ── Responses ────────────────────────────────────────────────────

/// Body of `GET /info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeInfo {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// An encoded still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

// ── Request bodies ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    #[serde(deserialize_with = "int_like")]
    pub x: i64,
    #[serde(deserialize_with = "int_like")]
    pub y: i64,
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    #[serde(deserialize_with = "int_like")]
    pub x1: i64,
    #[serde(deserialize_with = "int_like")]
    pub y1: i64,
    #[serde(deserialize_with = "int_like")]
    pub x2: i64,
    #[serde(deserialize_with = "int_like")]
    pub y2: i64,
    /// Milliseconds.
    #[serde(deserialize_with = "int_like")]
    pub duration: i64,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(deserialize_with = "text_like")]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    #[serde(deserialize_with = "int_like")]
    pub key: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntLike {
    Int(i64),
    Str(String),
}

/// JSON integer or a string holding one.
fn int_like<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match IntLike::deserialize(d)? {
        IntLike::Int(v) => Ok(v),
        IntLike::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("`{s}` is not an integer"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextLike {
    Str(String),
    Num(serde_json::Number),
}

/// JSON string, or a number taken by its decimal text.
fn text_like<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match TextLike::deserialize(d)? {
        TextLike::Str(s) => s,
        TextLike::Num(n) => n.to_string(),
    })
}

fn parse<T: for<'de> Deserialize<'de>>(body: &Value) -> Result<T, BridgeError> {
    T::deserialize(body).map_err(|e| BridgeError::InvalidRequest(e.to_string()))
}

// ── Bridge ───────────────────────────────────────────────────────

/// Stateless entry point for REST handlers.
#[derive(Clone)]
pub struct Bridge {
    controller: SessionController,
    encoder: InputEncoder,
    images: Arc<dyn ImageEncoder>,
    shutdown: CancellationToken,
}

impl Bridge {
    /// Build a bridge and its session controller. Cancelling `shutdown`
    /// tears down any running session.
    pub fn new(config: SessionConfig, collab: Collaborators, shutdown: CancellationToken) -> Self {
        let ids = Arc::new(CommandIds::new());
        let encoder = InputEncoder::new(Arc::clone(&ids), config.input.clone());
        let images = Arc::clone(&collab.images);
        let controller = SessionController::new(config, collab, ids, shutdown.clone());
        Self {
            controller,
            encoder,
            images,
            shutdown,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Cancelled once the process is shutting down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    fn require_live(&self) -> Result<LiveSession, BridgeError> {
        let live = self.controller.live().ok_or(BridgeError::NotLive)?;
        if !live.writer.is_open() {
            return Err(BridgeError::NoChannel);
        }
        Ok(live)
    }

    async fn send(&self, live: &LiveSession, plan: Vec<PacedCommand>) -> Result<(), BridgeError> {
        debug!(commands = plan.len(), "sending input burst");
        live.writer.transmit(&plan, &live.cancel).await
    }

    pub fn info(&self) -> BridgeInfo {
        let state = self.controller.state();
        let screen = state.live.as_ref().map(|live| live.screen);
        BridgeInfo {
            status: state.phase.status_label(),
            width: screen.map(|s| s.width),
            height: screen.map(|s| s.height),
        }
    }

    /// Latest fresh frame, encoded on the blocking pool.
    pub async fn screencap(&self) -> Result<Snapshot, BridgeError> {
        let live = self.require_live()?;
        let frame = live
            .frames
            .current_snapshot(self.controller.config().max_staleness)
            .ok_or(BridgeError::NoSnapshot)?;

        let images = Arc::clone(&self.images);
        let format = ImageFormat::Jpeg;
        let bytes = tokio::task::spawn_blocking(move || images.encode(&frame, format))
            .await
            .map_err(|e| BridgeError::Other(format!("image encoder task failed: {e}")))??;
        Ok(Snapshot { format, bytes })
    }

    pub async fn click(&self, body: &Value) -> Result<(), BridgeError> {
        let live = self.require_live()?;
        let req: ClickRequest = parse(body)?;
        let plan = self.encoder.encode_click(req.x, req.y, live.screen);
        self.send(&live, plan).await
    }

    pub async fn swipe(&self, body: &Value) -> Result<(), BridgeError> {
        let live = self.require_live()?;
        let req: SwipeRequest = parse(body)?;
        let duration = u64::try_from(req.duration)
            .ok()
            .filter(|&ms| ms > 0)
            .ok_or_else(|| {
                BridgeError::InvalidRequest(
                    "duration must be a positive number of milliseconds".into(),
                )
            })?;
        if req.duration > MAX_SWIPE_DURATION_MS {
            return Err(BridgeError::InvalidRequest(format!(
                "duration {} ms exceeds the {MAX_SWIPE_DURATION_MS} ms limit",
                req.duration
            )));
        }
        let plan = self.encoder.encode_swipe(
            (req.x1, req.y1),
            (req.x2, req.y2),
            duration,
            live.screen,
        );
        self.send(&live, plan).await
    }

    pub async fn input(&self, body: &Value) -> Result<(), BridgeError> {
        let live = self.require_live()?;
        let req: TextRequest = parse(body)?;
        if req.text.is_empty() {
            return Err(BridgeError::InvalidRequest("text must not be empty".into()));
        }
        let plan = self.encoder.encode_text(&req.text);
        self.send(&live, plan).await
    }

    pub async fn key(&self, body: &Value) -> Result<(), BridgeError> {
        let live = self.require_live()?;
        let req: KeyRequest = parse(body)?;
        let code = u32::try_from(req.key)
            .map_err(|_| BridgeError::InvalidRequest(format!("key code {} out of range", req.key)))?;
        let plan = self.encoder.encode_key(code);
        self.send(&live, plan).await
    }

    /// Start a session. Starting while one is already in progress succeeds.
    pub async fn start(&self) -> Result<(), BridgeError> {
        match self.controller.start().await {
            Err(BridgeError::AlreadyInProgress) => {
                debug!("start requested while a session is in progress");
                Ok(())
            }
            other => other,
        }
    }

    /// Stop the current session, if any.
    pub async fn exit(&self) {
        self.controller.stop().await;
    }

    /// Stop the session and signal process shutdown.
    pub async fn shutdown(&self) {
        info!("bridge shutting down");
        self.controller.stop().await;
        self.shutdown.cancel();
    }
}
