//! Bridge service core logic.
//!
//! Owns the HTTP listener and the session bridge. Runs until the stop
//! token is cancelled (Ctrl-C in the binary), then drains in-flight
//! requests and tears the session down.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use cgbridge_core::{Bridge, Collaborators};

use crate::config::BridgeConfig;
use crate::http;
use crate::jpeg::JpegImages;
use crate::media::NoMediaBackend;
use crate::signaling::WsSignalingClient;
use crate::token::FileTokenProvider;

// ── BridgeService ────────────────────────────────────────────────

pub struct BridgeService {
    config: BridgeConfig,
    collab: Collaborators,
    shutdown: CancellationToken,
}

impl BridgeService {
    /// Service with the collaborators built from `config`.
    pub fn new(config: BridgeConfig) -> Self {
        let collab = Collaborators {
            tokens: Arc::new(FileTokenProvider::new(&config.session.token_file)),
            signaling: Arc::new(WsSignalingClient::new(
                config.signaling.url.clone(),
                config.connect_timeout(),
            )),
            media: Arc::new(NoMediaBackend),
            images: Arc::new(JpegImages::new(config.jpeg_quality())),
        };
        Self::with_collaborators(config, collab)
    }

    pub fn with_collaborators(config: BridgeConfig, collab: Collaborators) -> Self {
        Self {
            config,
            collab,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops the service.
    pub fn stop_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until stopped.
    ///
    /// 1. Binds the HTTP listener.
    /// 2. Starts a session if `autostart` is set.
    /// 3. Serves requests until the stop token fires.
    /// 4. Stops the session and waits for its teardown.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let bridge = Bridge::new(
            self.config.to_session_config(),
            self.collab.clone(),
            self.shutdown.clone(),
        );

        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("API listening on http://{}", listener.local_addr()?);

        if self.config.session.autostart {
            bridge.start().await?;
        }

        let stop = self.shutdown.clone();
        axum::serve(listener, http::router(bridge.clone()))
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await?;

        bridge.exit().await;
        info!("bridge service stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgbridge_core::testing::Harness;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_until_stopped_and_tears_down() {
        let h = Harness::default();
        let mut config = BridgeConfig::default();
        config.server.port = 0;
        let service = BridgeService::with_collaborators(config, h.collaborators.clone());
        let stop = service.stop_handle();

        let run = tokio::spawn(async move { service.run().await.map_err(|e| e.to_string()) });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.connects(), 1);

        stop.cancel();
        run.await.unwrap().unwrap();
        assert!(h.channel.is_closed());
    }

    #[tokio::test]
    async fn no_autostart_leaves_session_idle() {
        let h = Harness::default();
        let mut config = BridgeConfig::default();
        config.server.port = 0;
        config.session.autostart = false;
        let service = BridgeService::with_collaborators(config, h.collaborators.clone());
        let stop = service.stop_handle();

        let run = tokio::spawn(async move { service.run().await.map_err(|e| e.to_string()) });
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.cancel();
        run.await.unwrap().unwrap();
        assert_eq!(h.connects(), 0);
    }
}
