//! Session configuration.

use std::time::Duration;

use crate::collab::SessionParams;
use crate::input::coords::ScreenSize;
use crate::input::encoder::InputTiming;
use crate::watchdog::DEFAULT_MAX_STALENESS;

/// Everything the controller and façade need to run one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Game identifier passed to the signaling client.
    pub game_id: String,
    /// Requested screen size; fixed for the lifetime of a session.
    pub screen: ScreenSize,
    /// Fully prefixed phone number for first-run interactive login.
    pub phone_number: Option<String>,
    /// How long to wait for the first frame before reporting unready.
    pub ready_timeout: Duration,
    /// Extra wait when no video track exists right after the handshake.
    pub track_grace: Duration,
    /// Upper bound for each teardown step.
    pub teardown_step_timeout: Duration,
    /// Interval of the stream health check while the session is up.
    pub health_poll: Duration,
    /// Oldest frame a snapshot may be served from.
    pub max_staleness: Duration,
    pub input: InputTiming,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game_id: "mrfz".into(),
            screen: ScreenSize {
                width: 1280,
                height: 720,
            },
            phone_number: None,
            ready_timeout: Duration::from_secs(20),
            track_grace: Duration::from_secs(3),
            teardown_step_timeout: Duration::from_secs(5),
            health_poll: Duration::from_secs(1),
            max_staleness: DEFAULT_MAX_STALENESS,
            input: InputTiming::default(),
        }
    }
}

impl SessionConfig {
    pub fn params(&self) -> SessionParams {
        SessionParams {
            game_id: self.game_id.clone(),
            width: self.screen.width,
            height: self.screen.height,
        }
    }
}
