//! User intent → paced command sequence.
//!
//! The encoder assumes validated input (the façade rejects bad requests
//! before calling it) and has no error path. Pacing is carried on each
//! [`PacedCommand`] and honoured by the
//! [`CommandWriter`](crate::input::writer::CommandWriter).

use std::sync::Arc;
use std::time::Duration;

use crate::input::command::{InputCommand, InputKind};
use crate::input::coords::{CoordinateSpace, ScreenSize};
use crate::input::ids::CommandIds;

// ── InputTiming ──────────────────────────────────────────────────

/// Tunable pacing for encoded gestures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTiming {
    /// Pause between the move and the click of a click gesture.
    pub click_settle: Duration,
    /// Pause after each character of a text burst.
    pub text_interval: Duration,
    /// Nominal spacing of swipe samples; the sample count is
    /// `duration / swipe_sample_interval`.
    pub swipe_sample_interval: Duration,
    /// Lower bound on the number of swipe move samples.
    pub min_swipe_samples: u32,
    /// Send a synthetic release when a swipe is cancelled mid-path.
    pub release_on_cancel: bool,
}

impl Default for InputTiming {
    fn default() -> Self {
        Self {
            click_settle: Duration::from_millis(50),
            text_interval: Duration::from_millis(50),
            swipe_sample_interval: Duration::from_millis(30),
            min_swipe_samples: 5,
            release_on_cancel: false,
        }
    }
}

// ── PacedCommand ─────────────────────────────────────────────────

/// A command and how long to wait after sending it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacedCommand {
    pub command: InputCommand,
    pub delay_after: Duration,
}

impl PacedCommand {
    fn new(command: InputCommand, delay_after: Duration) -> Self {
        Self {
            command,
            delay_after,
        }
    }
}

// ── SwipePath ────────────────────────────────────────────────────

/// One intermediate point of a swipe, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeSample {
    pub x: i64,
    pub y: i64,
    pub delay: Duration,
}

/// Upper bound on the number of move samples in one swipe.
pub const MAX_SWIPE_SAMPLES: u32 = 4096;

/// Linear swipe from `from` to `to`, sampled `n = max(min, duration /
/// interval)` times at progress `i / n` for `i = 1..=n`, with `n` capped
/// at [`MAX_SWIPE_SAMPLES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipePath {
    pub from: (i64, i64),
    pub to: (i64, i64),
    /// Time between consecutive samples: `duration / n`.
    pub step: Duration,
    pub samples: Vec<SwipeSample>,
}

impl SwipePath {
    pub fn linear(
        from: (i64, i64),
        to: (i64, i64),
        duration_ms: u64,
        sample_interval: Duration,
        min_samples: u32,
    ) -> Self {
        let interval_ms = u64::try_from(sample_interval.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        let floor = min_samples.clamp(1, MAX_SWIPE_SAMPLES);
        let n = u32::try_from(duration_ms / interval_ms)
            .unwrap_or(MAX_SWIPE_SAMPLES)
            .clamp(floor, MAX_SWIPE_SAMPLES);
        let step = Duration::from_millis(duration_ms) / n;

        let (x1, y1) = from;
        let (x2, y2) = to;
        let n_i = i64::from(n);
        // Saturating so that unclamped endpoints cannot overflow.
        let lerp = |a: i64, b: i64, i: i64| {
            let delta = i128::from(b) - i128::from(a);
            let offset = delta * i128::from(i) / i128::from(n_i);
            let saturated = if offset < 0 { i64::MIN } else { i64::MAX };
            i64::try_from(i128::from(a) + offset).unwrap_or(saturated)
        };
        let samples = (1..=n_i)
            .map(|i| SwipeSample {
                x: lerp(x1, x2, i),
                y: lerp(y1, y2, i),
                delay: step,
            })
            .collect();

        Self {
            from,
            to,
            step,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ── InputEncoder ─────────────────────────────────────────────────

/// Builds wire commands for click, swipe, text and key intents.
#[derive(Debug, Clone)]
pub struct InputEncoder {
    ids: Arc<CommandIds>,
    timing: InputTiming,
}

impl InputEncoder {
    pub fn new(ids: Arc<CommandIds>, timing: InputTiming) -> Self {
        Self { ids, timing }
    }

    /// Move to `(x, y)`, settle, then click there. Pixel space.
    pub fn encode_click(&self, x: i64, y: i64, screen: ScreenSize) -> Vec<PacedCommand> {
        let (px, py) = CoordinateSpace::Pixel.map_point(x, y, screen);
        let mv = InputCommand::at(self.ids.next(), InputKind::MouseMove, px, py, 0);
        let click = InputCommand::at(self.ids.next(), InputKind::Click, px, py, 0);
        vec![
            PacedCommand::new(mv, self.timing.click_settle),
            PacedCommand::new(click, Duration::ZERO),
        ]
    }

    /// Press at the start, `n` paced moves along the path, release at the
    /// end. Normalized space, touch slot 0. Endpoints are clamped to the
    /// screen before interpolation.
    pub fn encode_swipe(
        &self,
        from: (i64, i64),
        to: (i64, i64),
        duration_ms: u64,
        screen: ScreenSize,
    ) -> Vec<PacedCommand> {
        let on_screen = |(x, y): (i64, i64)| {
            let (px, py) = CoordinateSpace::Pixel.map_point(x, y, screen);
            (i64::from(px), i64::from(py))
        };
        let (from, to) = (on_screen(from), on_screen(to));
        let path = SwipePath::linear(
            from,
            to,
            duration_ms,
            self.timing.swipe_sample_interval,
            self.timing.min_swipe_samples,
        );
        let space = CoordinateSpace::Normalized;
        let touch = |kind, x, y| {
            let (nx, ny) = space.map_point(x, y, screen);
            InputCommand::at(self.ids.next(), kind, nx, ny, 0)
        };

        let mut plan = Vec::with_capacity(path.len() + 2);
        plan.push(PacedCommand::new(
            touch(InputKind::Press, from.0, from.1),
            path.step,
        ));
        let last = path.len().saturating_sub(1);
        for (i, sample) in path.samples.iter().enumerate() {
            let delay = if i == last { Duration::ZERO } else { sample.delay };
            plan.push(PacedCommand::new(
                touch(InputKind::Move, sample.x, sample.y),
                delay,
            ));
        }
        plan.push(PacedCommand::new(
            touch(InputKind::Release, to.0, to.1),
            Duration::ZERO,
        ));
        plan
    }

    /// One text command per character, each followed by the text interval.
    pub fn encode_text(&self, text: &str) -> Vec<PacedCommand> {
        text.chars()
            .map(|ch| {
                PacedCommand::new(
                    InputCommand::text(self.ids.next(), ch),
                    self.timing.text_interval,
                )
            })
            .collect()
    }

    pub fn encode_key(&self, code: u32) -> Vec<PacedCommand> {
        vec![PacedCommand::new(
            InputCommand::key(self.ids.next(), code),
            Duration::ZERO,
        )]
    }
}
