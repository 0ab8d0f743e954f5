//! Integration tests: full session lifecycle through the public API,
//! with collaborators implemented outside the crate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cgbridge_core::{
    Bridge, BridgeError, Collaborators, Credential, FrameSource, ImageEncoder, ImageFormat,
    MediaSession, MediaSubsystem, MessageChannel, PixelFormat, SessionConfig, SessionParams,
    SessionPhase, SignalingClient, SignalingSession, TokenProvider, VideoFrame,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ── Helpers ──────────────────────────────────────────────────────

type Wire = Arc<Mutex<Vec<Value>>>;

struct Tokens;

#[async_trait]
impl TokenProvider for Tokens {
    async fn load_stored_credential(&self) -> Result<Option<Credential>, BridgeError> {
        Ok(Some(Credential::new("abc")))
    }

    async fn login(&self, _phone: &str) -> Result<Credential, BridgeError> {
        Err(BridgeError::Credential("not interactive".into()))
    }
}

struct Channel(Wire);

#[async_trait]
impl MessageChannel for Channel {
    async fn send(&mut self, message: String) -> Result<(), BridgeError> {
        self.0.lock().unwrap().push(serde_json::from_str(&message)?);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
}

struct Signaling(Wire);

#[async_trait]
impl SignalingClient for Signaling {
    async fn connect(
        &self,
        _credential: &Credential,
        _params: &SessionParams,
    ) -> Result<SignalingSession, BridgeError> {
        Ok(SignalingSession {
            offer: "v=0".into(),
            channel: Box::new(Channel(Arc::clone(&self.0))),
        })
    }
}

struct Track(mpsc::Receiver<VideoFrame>);

#[async_trait]
impl FrameSource for Track {
    async fn recv(&mut self) -> Result<VideoFrame, BridgeError> {
        self.0.recv().await.ok_or(BridgeError::StreamEnded)
    }
}

struct Media(Mutex<Option<mpsc::Receiver<VideoFrame>>>);

struct Negotiated(Option<Track>);

#[async_trait]
impl MediaSubsystem for Media {
    async fn negotiate(&self, _offer: &str) -> Result<Box<dyn MediaSession>, BridgeError> {
        let rx = self.0.lock().unwrap().take();
        Ok(Box::new(Negotiated(rx.map(Track))))
    }
}

#[async_trait]
impl MediaSession for Negotiated {
    fn answer(&self) -> &str {
        "v=0 answer"
    }

    fn take_video(&mut self) -> Option<Box<dyn FrameSource>> {
        self.0.take().map(|t| Box::new(t) as Box<dyn FrameSource>)
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
}

struct ByteCount;

impl ImageEncoder for ByteCount {
    fn encode(&self, frame: &VideoFrame, _format: ImageFormat) -> Result<Vec<u8>, BridgeError> {
        Ok(frame.byte_len().to_le_bytes().to_vec())
    }
}

fn setup() -> (Bridge, Wire, mpsc::Sender<VideoFrame>) {
    let wire: Wire = Arc::default();
    let (tx, rx) = mpsc::channel(16);
    let collab = Collaborators {
        tokens: Arc::new(Tokens),
        signaling: Arc::new(Signaling(Arc::clone(&wire))),
        media: Arc::new(Media(Mutex::new(Some(rx)))),
        images: Arc::new(ByteCount),
    };
    let bridge = Bridge::new(SessionConfig::default(), collab, CancellationToken::new());
    (bridge, wire, tx)
}

fn frame() -> VideoFrame {
    VideoFrame::packed(4, 2, PixelFormat::Rgba8, vec![0; 32])
}

async fn wait_live(bridge: &Bridge) {
    bridge
        .controller()
        .subscribe()
        .wait_for(|s| s.phase.is_live())
        .await
        .map(|_| ())
        .unwrap();
}

// ── Session lifecycle ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_full_session_lifecycle() {
    let (bridge, wire, frames) = setup();
    assert_eq!(bridge.info().status, "disconnected");

    bridge.start().await.unwrap();
    assert_eq!(bridge.info().status, "connecting");

    frames.send(frame()).await.unwrap();
    wait_live(&bridge).await;
    assert_eq!(bridge.info().status, "ok");

    bridge.click(&json!({ "x": 640, "y": 360 })).await.unwrap();
    bridge.input(&json!({ "text": "hi" })).await.unwrap();
    let snap = bridge.screencap().await.unwrap();
    assert_eq!(snap.bytes, 32usize.to_le_bytes().to_vec());

    bridge.exit().await;
    assert_eq!(bridge.controller().phase(), SessionPhase::Idle);

    let sent = wire.lock().unwrap().clone();
    let ops: Vec<&str> = sent.iter().filter_map(|m| m["op"].as_str()).collect();
    assert_eq!(ops, ["answer", "input", "input", "input", "input", "exit"]);
    assert_eq!(sent[0]["data"]["sdp"], "v=0 answer");
    assert_eq!(sent[5]["data"]["token"], "abc");

    let ids: Vec<u64> = sent
        .iter()
        .map(|m| m["id"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids: {ids:?}");
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_exit() {
    let (bridge, wire, frames) = setup();
    bridge.start().await.unwrap();
    frames.send(frame()).await.unwrap();
    wait_live(&bridge).await;
    bridge.exit().await;

    // The single track was consumed; the second session never sees video.
    bridge.start().await.unwrap();
    bridge
        .controller()
        .subscribe()
        .wait_for(|s| s.phase == SessionPhase::Stalled)
        .await
        .map(|_| ())
        .unwrap();
    assert_eq!(bridge.info().status, "connecting");
    assert!(matches!(
        bridge.screencap().await,
        Err(BridgeError::NotLive)
    ));

    bridge.exit().await;
    let answers = wire
        .lock()
        .unwrap()
        .iter()
        .filter(|m| m["op"] == "answer")
        .count();
    assert_eq!(answers, 2);
}

#[tokio::test(start_paused = true)]
async fn test_input_paced_while_live() {
    let (bridge, wire, frames) = setup();
    bridge.start().await.unwrap();
    frames.send(frame()).await.unwrap();
    wait_live(&bridge).await;

    let began = tokio::time::Instant::now();
    bridge
        .swipe(&json!({ "x1": 0, "y1": 0, "x2": 100, "y2": 0, "duration": "100" }))
        .await
        .unwrap();
    assert!(began.elapsed() >= Duration::from_millis(100));

    let cmds: Vec<String> = wire
        .lock()
        .unwrap()
        .iter()
        .filter(|m| m["op"] == "input")
        .map(|m| m["data"]["cmd"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(cmds.len(), 7);
    bridge.exit().await;
}
