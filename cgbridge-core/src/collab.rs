//! Interfaces to the external collaborators of the bridge.
//!
//! The bridge only drives these traits; concrete signaling, media, image
//! and login implementations live outside this crate (see the server crate
//! and [`crate::testing`] for scripted ones).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::frame::{ImageFormat, VideoFrame};

// ── Credential ───────────────────────────────────────────────────

/// Opaque access token issued by the login provider.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for collaborators that must put it on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

// ── Session parameters ───────────────────────────────────────────

/// What the signaling client needs to open a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub game_id: String,
    pub width: u32,
    pub height: u32,
}

// ── Token provider ───────────────────────────────────────────────

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A previously stored credential, if any.
    async fn load_stored_credential(&self) -> Result<Option<Credential>, BridgeError>;

    /// Interactive login. May block on user input for a long time.
    async fn login(&self, phone_number: &str) -> Result<Credential, BridgeError>;
}

// ── Signaling ────────────────────────────────────────────────────

/// Live bidirectional message channel returned by the signaling client.
///
/// The bridge only writes to it: SDP answer, input commands, exit notice.
#[async_trait]
pub trait MessageChannel: Send {
    async fn send(&mut self, message: String) -> Result<(), BridgeError>;

    async fn close(&mut self) -> Result<(), BridgeError>;
}

/// Result of a successful signaling exchange.
pub struct SignalingSession {
    /// Session description offered by the remote host.
    pub offer: String,
    pub channel: Box<dyn MessageChannel>,
}

#[async_trait]
pub trait SignalingClient: Send + Sync {
    async fn connect(
        &self,
        credential: &Credential,
        params: &SessionParams,
    ) -> Result<SignalingSession, BridgeError>;
}

// ── Media ────────────────────────────────────────────────────────

/// Pull-based source of decoded frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Suspends until the next frame. Returns [`BridgeError::StreamEnded`]
    /// once the track is gone; any other error is a transient hiccup.
    async fn recv(&mut self) -> Result<VideoFrame, BridgeError>;
}

/// A negotiated media session.
#[async_trait]
pub trait MediaSession: Send {
    /// Local session description to send back over signaling.
    fn answer(&self) -> &str;

    /// The video track, once the remote side has announced one.
    /// Returns `Some` at most once.
    fn take_video(&mut self) -> Option<Box<dyn FrameSource>>;

    async fn close(&mut self) -> Result<(), BridgeError>;
}

#[async_trait]
pub trait MediaSubsystem: Send + Sync {
    async fn negotiate(&self, offer: &str) -> Result<Box<dyn MediaSession>, BridgeError>;
}

// ── Image encoding ───────────────────────────────────────────────

/// Turns one decoded frame into a still image. CPU-bound; callers run it
/// on the blocking pool.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, frame: &VideoFrame, format: ImageFormat) -> Result<Vec<u8>, BridgeError>;
}

// ── Collaborators ────────────────────────────────────────────────

/// The full set of collaborators a bridge is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub tokens: Arc<dyn TokenProvider>,
    pub signaling: Arc<dyn SignalingClient>,
    pub media: Arc<dyn MediaSubsystem>,
    pub images: Arc<dyn ImageEncoder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::new("secret-token");
        let shown = format!("{cred:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("12 bytes"));
    }

    #[test]
    fn blank_credential_is_empty() {
        assert!(Credential::new("  \n").is_empty());
        assert!(!Credential::new("abc").is_empty());
    }
}
