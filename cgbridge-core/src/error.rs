//! Domain-specific error types for the session bridge.
//!
//! All fallible operations return `Result<T, BridgeError>`.
//! The variants group into the classes the HTTP layer cares about:
//! precondition, validation, negotiation, stream, teardown and I/O.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the session bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    // ── Precondition Errors ──────────────────────────────────────
    /// The session is not in the `Live` phase.
    #[error("cloud gaming session is not live")]
    NotLive,

    /// The session is live but has no outbound command channel.
    #[error("no active input channel")]
    NoChannel,

    /// No video frame fresh enough to serve a snapshot.
    #[error("no fresh video frame available")]
    NoSnapshot,

    // ── Validation Errors ────────────────────────────────────────
    /// A request body failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ── Lifecycle Errors ─────────────────────────────────────────
    /// A session is already connecting, live or closing.
    #[error("a session is already in progress")]
    AlreadyInProgress,

    /// A phase transition was attempted from the wrong phase.
    #[error("invalid session transition: {0}")]
    InvalidTransition(&'static str),

    // ── Negotiation Errors ───────────────────────────────────────
    /// No credential could be obtained.
    #[error("credential unavailable: {0}")]
    Credential(String),

    /// The signaling exchange failed.
    #[error("signaling failed: {0}")]
    Signaling(String),

    /// Media negotiation failed.
    #[error("media negotiation failed: {0}")]
    Negotiation(String),

    // ── Stream Errors ────────────────────────────────────────────
    /// The video stream ended; no more frames will arrive.
    #[error("video stream ended")]
    StreamEnded,

    /// A single frame could not be decoded. Transient.
    #[error("frame decode error: {0}")]
    Decode(String),

    // ── Channel / I/O Errors ─────────────────────────────────────
    /// The message channel reported an error.
    #[error("channel error: {0}")]
    Channel(String),

    /// The message channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// The I/O layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    // ── Encoding Errors ──────────────────────────────────────────
    /// Image or message encoding failed.
    #[error("encoding error: {0}")]
    Encode(String),

    // ── Control Flow ─────────────────────────────────────────────
    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The operation was cancelled via its `CancellationToken`.
    #[error("operation cancelled")]
    Cancelled,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// Errors caused by the service not being ready for the request.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotLive | Self::NoChannel | Self::NoSnapshot)
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for BridgeError {
    fn from(s: String) -> Self {
        BridgeError::Other(s)
    }
}

impl From<&str> for BridgeError {
    fn from(s: &str) -> Self {
        BridgeError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Encode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = BridgeError::InvalidRequest("missing field `x`".into());
        assert!(e.to_string().contains("missing field"));

        let e = BridgeError::Timeout(Duration::from_secs(5));
        assert!(e.to_string().contains("5s"));
    }

    #[test]
    fn precondition_classification() {
        assert!(BridgeError::NotLive.is_precondition());
        assert!(BridgeError::NoSnapshot.is_precondition());
        assert!(!BridgeError::InvalidRequest(String::new()).is_precondition());
        assert!(!BridgeError::AlreadyInProgress.is_precondition());
    }

    #[test]
    fn from_string() {
        let e: BridgeError = "something broke".into();
        assert!(matches!(e, BridgeError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: BridgeError = io_err.into();
        assert!(matches!(e, BridgeError::Io(_)));
    }
}
