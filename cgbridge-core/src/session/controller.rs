//! Session lifecycle controller.
//!
//! Owns at most one remote session. `start` spawns a session task that runs
//! the whole life of the session on its own:
//!
//! | Step        | What happens                                            |
//! |-------------|---------------------------------------------------------|
//! | credential  | stored token, else interactive login                    |
//! | signaling   | `connect` → offer + message channel                     |
//! | negotiation | media `negotiate(offer)`, SDP answer sent on channel    |
//! | video       | take the track (one grace retry), spawn frame pump      |
//! | ready wait  | first frame → `Live`, timeout → `Stalled`               |
//! | stay alive  | periodic health check, `Live` ⇄ `Stalled`               |
//! | teardown    | frames → exit notice → media → channel, each bounded    |
//!
//! `stop` cancels the session token and waits for the task to finish its
//! teardown. The session token is a child of the process shutdown token.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collab::{Collaborators, Credential, MediaSession, SignalingSession};
use crate::error::BridgeError;
use crate::input::coords::ScreenSize;
use crate::input::ids::CommandIds;
use crate::input::writer::CommandWriter;
use crate::message::Envelope;
use crate::session::config::SessionConfig;
use crate::session::phase::SessionPhase;
use crate::watchdog::{FrameWatchdog, HealthEdge, pump_frames};

// ── LiveSession ──────────────────────────────────────────────────

/// Handle to a session that is ready to serve input and snapshots.
#[derive(Clone)]
pub struct LiveSession {
    pub screen: ScreenSize,
    pub writer: Arc<CommandWriter>,
    pub frames: FrameWatchdog,
    /// Cancelled when the session shuts down; paced input selects on it.
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("screen", &self.screen)
            .field("channel_open", &self.writer.is_open())
            .field("has_frame", &self.frames.has_frame())
            .finish()
    }
}

/// Published view of the controller.
///
/// `live` is `Some` exactly while `phase` is `Live`.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub live: Option<LiveSession>,
}

// ── SessionController ────────────────────────────────────────────

#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    collab: Collaborators,
    ids: Arc<CommandIds>,
    shutdown: CancellationToken,
    state: watch::Sender<SessionState>,
    run: Mutex<Option<SessionRun>>,
}

struct SessionRun {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Resources acquired so far, released in order on teardown.
#[derive(Default)]
struct Acquired {
    credential: Option<Credential>,
    writer: Option<Arc<CommandWriter>>,
    media: Option<Box<dyn MediaSession>>,
    frames: Option<SessionRun>,
    watchdog: FrameWatchdog,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        collab: Collaborators,
        ids: Arc<CommandIds>,
        shutdown: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner {
                config,
                collab,
                ids,
                shutdown,
                state,
                run: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn ids(&self) -> &Arc<CommandIds> {
        &self.inner.ids
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state.borrow().phase.clone()
    }

    /// The live handle, if the session is `Live`.
    pub fn live(&self) -> Option<LiveSession> {
        self.inner.state.borrow().live.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Begin a new session in the background.
    ///
    /// Fails with [`BridgeError::AlreadyInProgress`] and changes nothing
    /// unless the controller is `Idle`.
    pub async fn start(&self) -> Result<(), BridgeError> {
        let mut run = self.inner.run.lock().await;
        let began = self
            .inner
            .state
            .send_if_modified(|state| state.phase.begin_connect().is_ok());
        if !began {
            debug!(phase = %self.phase(), "start rejected");
            return Err(BridgeError::AlreadyInProgress);
        }

        let cancel = self.inner.shutdown.child_token();
        let task = tokio::spawn(run_session(Arc::clone(&self.inner), cancel.clone()));
        *run = Some(SessionRun { cancel, task });
        info!(game = %self.inner.config.game_id, "session starting");
        Ok(())
    }

    /// Cancel the current session and wait for its teardown. No-op when
    /// nothing is running.
    pub async fn stop(&self) {
        let Some(run) = self.inner.run.lock().await.take() else {
            return;
        };
        run.cancel.cancel();
        if let Err(e) = run.task.await {
            error!("session task failed: {e}");
            self.inner.publish(|state| {
                state.live = None;
                state.phase.force_idle();
                true
            });
        }
    }
}

// ── Session task ─────────────────────────────────────────────────

async fn run_session(inner: Arc<Inner>, cancel: CancellationToken) {
    let mut parts = Acquired::default();

    match inner.establish(&cancel, &mut parts).await {
        Ok(handle) => {
            inner.stay_alive(&cancel, &handle).await;
            let mut live_for = None;
            inner.publish(|state| {
                live_for = state.phase.live_duration();
                state.live = None;
                state.phase.begin_close().is_ok()
            });
            info!(?live_for, "session closing");
        }
        Err(BridgeError::Cancelled) => info!("session start cancelled"),
        Err(e) => error!("session negotiation failed: {e}"),
    }

    inner.teardown(parts).await;
    inner.publish(|state| {
        state.live = None;
        state.phase.finish().is_ok()
    });
    info!("session closed");
}

impl Inner {
    fn publish(&self, modify: impl FnOnce(&mut SessionState) -> bool) {
        self.state.send_if_modified(modify);
    }

    async fn acquire_credential(&self) -> Result<Credential, BridgeError> {
        if let Some(stored) = self.collab.tokens.load_stored_credential().await? {
            if !stored.is_empty() {
                debug!("using stored credential");
                return Ok(stored);
            }
        }
        let Some(phone) = self.config.phone_number.as_deref() else {
            return Err(BridgeError::Credential(
                "no stored credential and no phone number for login".into(),
            ));
        };
        info!("no stored credential, starting interactive login");
        let credential = self.collab.tokens.login(phone).await?;
        if credential.is_empty() {
            return Err(BridgeError::Credential("login returned an empty token".into()));
        }
        Ok(credential)
    }

    async fn establish(
        &self,
        cancel: &CancellationToken,
        parts: &mut Acquired,
    ) -> Result<LiveSession, BridgeError> {
        let credential = until_cancelled(cancel, self.acquire_credential()).await?;
        parts.credential = Some(credential.clone());

        let params = self.config.params();
        let SignalingSession { offer, channel } = until_cancelled(
            cancel,
            self.collab.signaling.connect(&credential, &params),
        )
        .await?;
        let writer = Arc::new(CommandWriter::new(
            channel,
            Arc::clone(&self.ids),
            self.config.input.release_on_cancel,
        ));
        parts.writer = Some(Arc::clone(&writer));
        info!(width = params.width, height = params.height, "signaling connected");

        let media = until_cancelled(cancel, self.collab.media.negotiate(&offer)).await?;
        let answer = Envelope::answer(self.ids.next(), media.answer()).to_json();
        let media = parts.media.insert(media);
        writer.send_message(answer?).await?;
        debug!("sdp answer sent");

        let mut video = media.take_video();
        if video.is_none() {
            debug!(grace = ?self.config.track_grace, "no video track yet, waiting");
            until_cancelled(cancel, async {
                tokio::time::sleep(self.config.track_grace).await;
                Ok(())
            })
            .await?;
            video = media.take_video();
        }
        match video {
            Some(source) => {
                let pump_cancel = cancel.child_token();
                let task = tokio::spawn(pump_frames(
                    source,
                    parts.watchdog.clone(),
                    pump_cancel.clone(),
                ));
                parts.frames = Some(SessionRun {
                    cancel: pump_cancel,
                    task,
                });
            }
            None => warn!("remote side announced no video track"),
        }

        let handle = LiveSession {
            screen: self.config.screen,
            writer,
            frames: parts.watchdog.clone(),
            cancel: cancel.clone(),
        };

        let ready = until_cancelled(cancel, async {
            Ok(handle.frames.wait_until_ready(self.config.ready_timeout).await)
        })
        .await?;

        if ready {
            self.publish(|state| {
                let live = state.phase.go_live().is_ok();
                if live {
                    state.live = Some(handle.clone());
                }
                live
            });
            info!("session live");
        } else {
            handle.frames.mark_degraded();
            self.publish(|state| state.phase.stall().is_ok());
            warn!(
                timeout = ?self.config.ready_timeout,
                "no video frame yet, session kept alive but not ready"
            );
        }
        Ok(handle)
    }

    async fn stay_alive(&self, cancel: &CancellationToken, handle: &LiveSession) {
        let mut ticker = tokio::time::interval(self.config.health_poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            match handle.frames.check_health(self.config.max_staleness) {
                Some(HealthEdge::Degraded) => {
                    warn!(max = ?self.config.max_staleness, "video stream stale");
                    self.publish(|state| {
                        let stalled = state.phase.stall().is_ok();
                        if stalled {
                            state.live = None;
                        }
                        stalled
                    });
                }
                Some(HealthEdge::Recovered) => {
                    info!("video stream live again");
                    self.publish(|state| {
                        let live = state.phase.go_live().is_ok();
                        if live {
                            state.live = Some(handle.clone());
                        }
                        live
                    });
                }
                None => {}
            }
        }
    }

    async fn teardown(&self, parts: Acquired) {
        let limit = self.config.teardown_step_timeout;
        let Acquired {
            credential,
            writer,
            mut media,
            frames,
            ..
        } = parts;

        if let Some(frames) = frames {
            frames.cancel.cancel();
            bounded("stop frame reception", limit, async {
                frames
                    .task
                    .await
                    .map_err(|e| BridgeError::Other(e.to_string()))
            })
            .await;
        }

        if let (Some(writer), Some(credential)) = (&writer, &credential) {
            bounded("send exit notice", limit, async {
                let notice = Envelope::exit(self.ids.next(), credential.expose()).to_json()?;
                writer.send_message(notice).await
            })
            .await;
        }

        if let Some(media) = media.as_mut() {
            bounded("close media session", limit, media.close()).await;
        }

        if let Some(writer) = &writer {
            bounded("close signaling channel", limit, writer.close()).await;
        }
    }
}

/// Run `fut` unless `cancel` fires first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BridgeError::Cancelled),
        out = fut => out,
    }
}

/// One teardown step: bounded by `limit`, failures only logged.
async fn bounded(
    step: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<(), BridgeError>>,
) {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(())) => debug!(step, "teardown step done"),
        Ok(Err(e)) => warn!(step, "teardown step failed: {e}"),
        Err(_) => warn!(step, ?limit, "teardown step timed out"),
    }
}
