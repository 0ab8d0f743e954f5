//! Frame freshness watchdog.
//!
//! The frame-receive task is the only writer: every decoded frame replaces
//! the [`FrameRecord`] wholesale through a `tokio::sync::watch` channel, so
//! readers always see a complete record and never block the writer.
//!
//! Readers use the record to:
//! - wait for the first frame when a session starts,
//! - fetch the latest frame for a snapshot if it is fresh enough,
//! - detect (edge-triggered) when the stream goes stale or recovers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::collab::FrameSource;
use crate::error::BridgeError;
use crate::frame::VideoFrame;

/// Default staleness threshold for snapshots.
pub const DEFAULT_MAX_STALENESS: Duration = Duration::from_secs(10);

// ── FrameRecord ──────────────────────────────────────────────────

/// Most recent frame and when it arrived.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub frame: Arc<VideoFrame>,
    pub received_at: Instant,
}

impl FrameRecord {
    pub fn age(&self) -> Duration {
        self.received_at.elapsed()
    }
}

// ── HealthEdge ───────────────────────────────────────────────────

/// Transition reported by [`FrameWatchdog::check_health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthEdge {
    /// The stream just went stale.
    Degraded,
    /// A fresh frame arrived after a degraded report.
    Recovered,
}

// ── FrameWatchdog ────────────────────────────────────────────────

/// Cloneable handle to the frame record of one session.
#[derive(Debug, Clone)]
pub struct FrameWatchdog {
    inner: Arc<WatchdogInner>,
}

#[derive(Debug)]
struct WatchdogInner {
    latest: watch::Sender<Option<FrameRecord>>,
    degraded: AtomicBool,
}

impl Default for FrameWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWatchdog {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            inner: Arc::new(WatchdogInner {
                latest,
                degraded: AtomicBool::new(false),
            }),
        }
    }

    /// Record a new frame. The first call wakes every
    /// [`wait_until_ready`](Self::wait_until_ready) waiter.
    pub fn on_frame_received(&self, frame: VideoFrame) {
        let first = self.inner.latest.borrow().is_none();
        self.inner.latest.send_replace(Some(FrameRecord {
            frame: Arc::new(frame),
            received_at: Instant::now(),
        }));
        if first {
            debug!("first video frame received");
        }
    }

    /// Whether any frame has ever arrived.
    pub fn has_frame(&self) -> bool {
        self.inner.latest.borrow().is_some()
    }

    /// Snapshot of the current record.
    pub fn latest(&self) -> Option<FrameRecord> {
        self.inner.latest.borrow().clone()
    }

    /// Suspend until the first frame arrives or `timeout` elapses.
    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.inner.latest.subscribe();
        let ready = tokio::time::timeout(timeout, rx.wait_for(Option::is_some))
            .await
            .map(|seen| seen.is_ok());
        matches!(ready, Ok(true))
    }

    /// The last frame if one arrived within `max_staleness`.
    pub fn current_snapshot(&self, max_staleness: Duration) -> Option<Arc<VideoFrame>> {
        let latest = self.inner.latest.borrow();
        let record = latest.as_ref()?;
        (record.age() <= max_staleness).then(|| Arc::clone(&record.frame))
    }

    /// Edge-triggered health check.
    ///
    /// Returns `Degraded` once when the record goes stale and `Recovered`
    /// once when a fresh frame shows up again. Before the first frame the
    /// stream is neither fresh nor stale and `None` is returned, unless the
    /// watchdog was [marked degraded](Self::mark_degraded).
    pub fn check_health(&self, max_staleness: Duration) -> Option<HealthEdge> {
        let fresh = self.current_snapshot(max_staleness).is_some();
        let has_frame = self.has_frame();
        let was_degraded = self.inner.degraded.load(Ordering::Acquire);

        match (has_frame, fresh, was_degraded) {
            (true, false, false) => {
                self.inner.degraded.store(true, Ordering::Release);
                Some(HealthEdge::Degraded)
            }
            (true, true, true) => {
                self.inner.degraded.store(false, Ordering::Release);
                Some(HealthEdge::Recovered)
            }
            _ => None,
        }
    }

    /// Mark the stream degraded without a prior frame, so the first frame
    /// to arrive is reported as `Recovered`.
    pub fn mark_degraded(&self) {
        self.inner.degraded.store(true, Ordering::Release);
    }
}

// ── Frame pump ───────────────────────────────────────────────────

/// Pull frames from `source` into `watchdog` until cancelled or the stream
/// ends. Transient decode errors are logged and skipped.
pub async fn pump_frames(
    mut source: Box<dyn FrameSource>,
    watchdog: FrameWatchdog,
    cancel: CancellationToken,
) {
    let mut received: u64 = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = source.recv() => next,
        };
        match next {
            Ok(frame) => {
                watchdog.on_frame_received(frame);
                received += 1;
            }
            Err(BridgeError::StreamEnded) => {
                warn!(received, "video stream ended");
                return;
            }
            Err(e) => debug!("skipping frame: {e}"),
        }
    }
    debug!(received, "frame reception stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    fn frame(tag: u8) -> VideoFrame {
        VideoFrame::packed(1, 1, PixelFormat::Rgb8, vec![tag, tag, tag])
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_before_first_frame() {
        let wd = FrameWatchdog::new();
        assert!(!wd.has_frame());
        assert!(wd.current_snapshot(DEFAULT_MAX_STALENESS).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn staleness_window() {
        let wd = FrameWatchdog::new();
        wd.on_frame_received(frame(1));
        assert_eq!(wd.current_snapshot(DEFAULT_MAX_STALENESS).unwrap().data[0], 1);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(wd.current_snapshot(DEFAULT_MAX_STALENESS).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(wd.current_snapshot(DEFAULT_MAX_STALENESS).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_frame_replaces_record() {
        let wd = FrameWatchdog::new();
        wd.on_frame_received(frame(1));
        tokio::time::advance(Duration::from_secs(8)).await;
        wd.on_frame_received(frame(2));
        tokio::time::advance(Duration::from_secs(8)).await;
        let snap = wd.current_snapshot(DEFAULT_MAX_STALENESS).unwrap();
        assert_eq!(snap.data[0], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_ready_wakes_on_first_frame() {
        let wd = FrameWatchdog::new();
        let waiter = {
            let wd = wd.clone();
            tokio::spawn(async move { wd.wait_until_ready(Duration::from_secs(20)).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        wd.on_frame_received(frame(1));
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_ready_pends_until_woken() {
        use tokio_test::{assert_pending, assert_ready_eq, task};

        let wd = FrameWatchdog::new();
        let mut wait = task::spawn(wd.wait_until_ready(Duration::from_secs(20)));
        assert_pending!(wait.poll());
        wd.on_frame_received(frame(1));
        assert!(wait.is_woken());
        assert_ready_eq!(wait.poll(), true);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_ready_times_out() {
        let wd = FrameWatchdog::new();
        assert!(!wd.wait_until_ready(Duration::from_secs(20)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_ready_returns_immediately_when_ready() {
        let wd = FrameWatchdog::new();
        wd.on_frame_received(frame(1));
        assert!(wd.wait_until_ready(Duration::ZERO).await);
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_is_edge_triggered() {
        let wd = FrameWatchdog::new();
        let max = Duration::from_secs(10);
        assert_eq!(wd.check_health(max), None);

        wd.on_frame_received(frame(1));
        assert_eq!(wd.check_health(max), None);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(wd.check_health(max), Some(HealthEdge::Degraded));
        assert_eq!(wd.check_health(max), None);
        assert_eq!(wd.check_health(max), None);

        wd.on_frame_received(frame(2));
        assert_eq!(wd.check_health(max), Some(HealthEdge::Recovered));
        assert_eq!(wd.check_health(max), None);
    }

    #[tokio::test(start_paused = true)]
    async fn marked_degraded_recovers_on_first_frame() {
        let wd = FrameWatchdog::new();
        wd.mark_degraded();
        assert_eq!(wd.check_health(DEFAULT_MAX_STALENESS), None);
        wd.on_frame_received(frame(1));
        assert_eq!(
            wd.check_health(DEFAULT_MAX_STALENESS),
            Some(HealthEdge::Recovered)
        );
    }

    struct ChannelSource(mpsc::Receiver<Result<VideoFrame, BridgeError>>);

    #[async_trait]
    impl FrameSource for ChannelSource {
        async fn recv(&mut self) -> Result<VideoFrame, BridgeError> {
            self.0.recv().await.unwrap_or(Err(BridgeError::StreamEnded))
        }
    }

    #[tokio::test]
    async fn pump_skips_hiccups_and_stops_at_stream_end() {
        let (tx, rx) = mpsc::channel(8);
        let wd = FrameWatchdog::new();
        tx.send(Ok(frame(1))).await.unwrap();
        tx.send(Err(BridgeError::Decode("corrupt slice".into()))).await.unwrap();
        tx.send(Ok(frame(3))).await.unwrap();
        drop(tx);

        pump_frames(Box::new(ChannelSource(rx)), wd.clone(), CancellationToken::new()).await;
        assert_eq!(wd.latest().unwrap().frame.data[0], 3);
    }

    #[tokio::test]
    async fn pump_stops_on_cancel() {
        let (_tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump_frames(
            Box::new(ChannelSource(rx)),
            FrameWatchdog::new(),
            cancel.clone(),
        ));
        cancel.cancel();
        task.await.unwrap();
    }
}
