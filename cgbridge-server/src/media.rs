//! Media subsystem used by the stock binary.
//!
//! This build links no WebRTC/video-decoding stack, so negotiation always
//! fails and the session returns to idle after releasing signaling. A
//! decoding backend plugs in by implementing
//! [`MediaSubsystem`](cgbridge_core::MediaSubsystem) and passing it to
//! [`BridgeService::with_collaborators`](crate::service::BridgeService::with_collaborators).

use async_trait::async_trait;
use tracing::error;

use cgbridge_core::{BridgeError, MediaSession, MediaSubsystem};

#[derive(Debug, Default)]
pub struct NoMediaBackend;

#[async_trait]
impl MediaSubsystem for NoMediaBackend {
    async fn negotiate(&self, offer: &str) -> Result<Box<dyn MediaSession>, BridgeError> {
        error!(offer_len = offer.len(), "received an offer but no media backend is linked");
        Err(BridgeError::Negotiation(
            "no media backend linked into this build".into(),
        ))
    }
}
