//! # cgbridge-core
//!
//! Core library of the cloud-gaming session bridge: turns stateless REST
//! intents into input commands for one live remote game session, and
//! decides whether the inbound video is fresh enough to serve a snapshot.
//!
//! This crate contains:
//! - **Input**: coordinate normalizer, `InputEncoder`, `CommandWriter`
//! - **Watchdog**: `FrameWatchdog`, the latest-frame record and its health
//! - **Session**: `SessionPhase` machine and `SessionController`
//! - **Bridge**: `Bridge`, the request façade used by HTTP handlers
//! - **Collaborators**: traits for signaling, media, images and login
//! - **Error**: `BridgeError`, a `thiserror`-based error hierarchy

pub mod bridge;
pub mod collab;
pub mod error;
pub mod frame;
pub mod input;
pub mod message;
pub mod session;
pub mod watchdog;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use bridge::{Bridge, BridgeInfo, Snapshot};
pub use collab::{
    Collaborators, Credential, FrameSource, ImageEncoder, MediaSession, MediaSubsystem,
    MessageChannel, SessionParams, SignalingClient, SignalingSession, TokenProvider,
};
pub use error::BridgeError;
pub use frame::{ImageFormat, PixelFormat, VideoFrame};
pub use input::{CommandIds, CommandWriter, InputEncoder, InputTiming, ScreenSize};
pub use message::{Envelope, Op};
pub use session::{LiveSession, SessionConfig, SessionController, SessionPhase, SessionState};
pub use watchdog::{FrameWatchdog, HealthEdge};
