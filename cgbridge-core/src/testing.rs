//! Scripted collaborators for tests.
//!
//! Compiled for this crate's own tests and, through the `testing` feature,
//! for dependent crates' tests. A [`Harness`] bundles one of each
//! collaborator plus the handles a test needs to drive and observe them:
//! a frame feed, the recorded outbound channel and a shared event log.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::collab::{
    Collaborators, Credential, FrameSource, ImageEncoder, MediaSession, MediaSubsystem,
    MessageChannel, SessionParams, SignalingClient, SignalingSession, TokenProvider,
};
use crate::error::BridgeError;
use crate::frame::{ImageFormat, PixelFormat, VideoFrame};

/// A solid-colour RGB frame.
pub fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> VideoFrame {
    let data = rgb
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 3)
        .collect();
    VideoFrame::packed(width, height, PixelFormat::Rgb8, data)
}

// ── EventLog ─────────────────────────────────────────────────────

/// Ordered record of collaborator side effects.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event.into());
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }
}

// ── Script ───────────────────────────────────────────────────────

/// Behaviour knobs for the scripted collaborators.
#[derive(Debug, Clone)]
pub struct Script {
    pub stored_token: Option<String>,
    pub login_token: Option<String>,
    pub connect_delay: Duration,
    pub signaling_error: Option<String>,
    pub negotiate_error: Option<String>,
    /// `take_video` returns `None` this many times before the track shows.
    pub hidden_track_polls: usize,
    /// Never expose a video track.
    pub no_video: bool,
    /// `MediaSession::close` never completes.
    pub media_close_hangs: bool,
    pub encode_error: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            stored_token: Some("stored-token".into()),
            login_token: None,
            connect_delay: Duration::ZERO,
            signaling_error: None,
            negotiate_error: None,
            hidden_track_polls: 0,
            no_video: false,
            media_close_hangs: false,
            encode_error: None,
        }
    }
}

// ── Tokens ───────────────────────────────────────────────────────

pub struct ScriptedTokens {
    stored: Option<String>,
    login: Option<String>,
    pub logins: Mutex<Vec<String>>,
}

#[async_trait]
impl TokenProvider for ScriptedTokens {
    async fn load_stored_credential(&self) -> Result<Option<Credential>, BridgeError> {
        Ok(self.stored.clone().map(Credential::new))
    }

    async fn login(&self, phone_number: &str) -> Result<Credential, BridgeError> {
        if let Ok(mut logins) = self.logins.lock() {
            logins.push(phone_number.to_string());
        }
        self.login
            .clone()
            .map(Credential::new)
            .ok_or_else(|| BridgeError::Credential("login rejected".into()))
    }
}

// ── Signaling ────────────────────────────────────────────────────

/// Outbound channel that records every message.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    log: EventLog,
}

impl RecordingChannel {
    pub fn messages(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .map(|sent| {
                sent.iter()
                    .filter_map(|m| serde_json::from_str(m).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `op` of every message in send order.
    pub fn ops(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|m| m["op"].as_str().map(str::to_string))
            .collect()
    }

    /// `cmd` lines of every input message in send order.
    pub fn input_cmds(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter(|m| m["op"] == "input")
            .filter_map(|m| m["data"]["cmd"].as_str().map(str::to_string))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn send(&mut self, message: String) -> Result<(), BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::ChannelClosed);
        }
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(&message) {
            if let Some(op) = v["op"].as_str() {
                self.log.push(format!("sent {op}"));
            }
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.closed.store(true, Ordering::SeqCst);
        self.log.push("channel closed");
        Ok(())
    }
}

pub struct ScriptedSignaling {
    script: Script,
    channel: RecordingChannel,
    pub connects: AtomicUsize,
    pub last_params: Mutex<Option<SessionParams>>,
}

#[async_trait]
impl SignalingClient for ScriptedSignaling {
    async fn connect(
        &self,
        credential: &Credential,
        params: &SessionParams,
    ) -> Result<SignalingSession, BridgeError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_params.lock() {
            *last = Some(params.clone());
        }
        if credential.is_empty() {
            return Err(BridgeError::Signaling("empty credential".into()));
        }
        if !self.script.connect_delay.is_zero() {
            tokio::time::sleep(self.script.connect_delay).await;
        }
        if let Some(reason) = &self.script.signaling_error {
            return Err(BridgeError::Signaling(reason.clone()));
        }
        Ok(SignalingSession {
            offer: "offer-sdp".into(),
            channel: Box::new(self.channel.clone()),
        })
    }
}

// ── Media ────────────────────────────────────────────────────────

/// Test side of the video track.
pub type FrameFeed = mpsc::Sender<VideoFrame>;

struct FeedSource {
    rx: mpsc::Receiver<VideoFrame>,
    log: EventLog,
}

#[async_trait]
impl FrameSource for FeedSource {
    async fn recv(&mut self) -> Result<VideoFrame, BridgeError> {
        self.rx.recv().await.ok_or(BridgeError::StreamEnded)
    }
}

impl Drop for FeedSource {
    fn drop(&mut self) {
        self.log.push("frames stopped");
    }
}

pub struct ScriptedMedia {
    script: Script,
    feed: Mutex<Option<mpsc::Receiver<VideoFrame>>>,
    log: EventLog,
    pub offers: Mutex<Vec<String>>,
}

struct ScriptedMediaSession {
    video: Option<FeedSource>,
    hidden_polls: usize,
    close_hangs: bool,
    log: EventLog,
}

#[async_trait]
impl MediaSubsystem for ScriptedMedia {
    async fn negotiate(&self, offer: &str) -> Result<Box<dyn MediaSession>, BridgeError> {
        if let Ok(mut offers) = self.offers.lock() {
            offers.push(offer.to_string());
        }
        if let Some(reason) = &self.script.negotiate_error {
            return Err(BridgeError::Negotiation(reason.clone()));
        }
        let rx = if self.script.no_video {
            None
        } else {
            self.feed.lock().ok().and_then(|mut feed| feed.take())
        };
        Ok(Box::new(ScriptedMediaSession {
            video: rx.map(|rx| FeedSource {
                rx,
                log: self.log.clone(),
            }),
            hidden_polls: self.script.hidden_track_polls,
            close_hangs: self.script.media_close_hangs,
            log: self.log.clone(),
        }))
    }
}

#[async_trait]
impl MediaSession for ScriptedMediaSession {
    fn answer(&self) -> &str {
        "answer-sdp"
    }

    fn take_video(&mut self) -> Option<Box<dyn FrameSource>> {
        if self.hidden_polls > 0 {
            self.hidden_polls -= 1;
            return None;
        }
        self.video
            .take()
            .map(|source| Box::new(source) as Box<dyn FrameSource>)
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        if self.close_hangs {
            std::future::pending::<()>().await;
        }
        self.log.push("media closed");
        Ok(())
    }
}

// ── Images ───────────────────────────────────────────────────────

/// "Encodes" a frame as its raw pixel bytes.
pub struct RawImages {
    error: Option<String>,
}

impl ImageEncoder for RawImages {
    fn encode(&self, frame: &VideoFrame, _format: ImageFormat) -> Result<Vec<u8>, BridgeError> {
        match &self.error {
            Some(reason) => Err(BridgeError::Encode(reason.clone())),
            None => Ok(frame.data.clone()),
        }
    }
}

// ── Harness ──────────────────────────────────────────────────────

pub struct Harness {
    pub collaborators: Collaborators,
    pub tokens: Arc<ScriptedTokens>,
    pub signaling: Arc<ScriptedSignaling>,
    pub media: Arc<ScriptedMedia>,
    pub channel: RecordingChannel,
    pub feed: FrameFeed,
    pub log: EventLog,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(Script::default())
    }
}

impl Harness {
    pub fn new(script: Script) -> Self {
        let log = EventLog::default();
        let (feed, rx) = mpsc::channel(64);
        let channel = RecordingChannel {
            log: log.clone(),
            ..Default::default()
        };

        let tokens = Arc::new(ScriptedTokens {
            stored: script.stored_token.clone(),
            login: script.login_token.clone(),
            logins: Mutex::new(Vec::new()),
        });
        let signaling = Arc::new(ScriptedSignaling {
            script: script.clone(),
            channel: channel.clone(),
            connects: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        });
        let media = Arc::new(ScriptedMedia {
            script: script.clone(),
            feed: Mutex::new(Some(rx)),
            log: log.clone(),
            offers: Mutex::new(Vec::new()),
        });
        let images = Arc::new(RawImages {
            error: script.encode_error.clone(),
        });

        let collaborators = Collaborators {
            tokens: tokens.clone(),
            signaling: signaling.clone(),
            media: media.clone(),
            images,
        };

        Self {
            collaborators,
            tokens,
            signaling,
            media,
            channel,
            feed,
            log,
        }
    }

    pub fn connects(&self) -> usize {
        self.signaling.connects.load(Ordering::SeqCst)
    }

    /// Push one frame into the video track.
    pub async fn push_frame(&self, frame: VideoFrame) {
        let _ = self.feed.send(frame).await;
    }
}
