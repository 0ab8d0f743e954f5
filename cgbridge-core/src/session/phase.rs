//! Session lifecycle phases.
//!
//! Validated transitions return `Result` instead of panicking.
//!
//! ```text
//!   Idle ──► Connecting ──► Live ◄──► Stalled
//!    ▲           │           │           │
//!    │           ▼           ▼           ▼
//!    └─────────────────── Closing ◄──────┘
//! ```
//!
//! `Connecting → Idle` and `Live → Idle` are also allowed directly, for
//! failed negotiation and unrecoverable errors.

use std::time::Instant;

use crate::error::BridgeError;

// ── SessionPhase ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No session. Initial / terminal state.
    #[default]
    Idle,

    /// Credential, signaling and media negotiation in progress.
    Connecting,

    /// Video is flowing; input and snapshots are served.
    Live {
        /// When the session (last) entered `Live`.
        since: Instant,
    },

    /// Negotiated but unready: the video never started or went stale.
    /// The session is kept alive and may return to `Live`.
    Stalled,

    /// Teardown in progress.
    Closing,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Live { .. } => write!(f, "Live"),
            Self::Stalled => write!(f, "Stalled"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

impl SessionPhase {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Status string reported to REST clients.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Live { .. } => "ok",
            Self::Connecting | Self::Stalled => "connecting",
            Self::Idle | Self::Closing => "disconnected",
        }
    }

    /// How long the session has been `Live`.
    pub fn live_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Live { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Idle`.
    pub fn begin_connect(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Idle => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(BridgeError::InvalidTransition(
                "cannot start: a session is already in progress",
            )),
        }
    }

    /// Valid from: `Connecting`, `Stalled`.
    pub fn go_live(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Connecting | Self::Stalled => {
                *self = Self::Live {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(BridgeError::InvalidTransition(
                "cannot go live: not Connecting or Stalled",
            )),
        }
    }

    /// Valid from: `Connecting`, `Live`.
    pub fn stall(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Connecting | Self::Live { .. } => {
                *self = Self::Stalled;
                Ok(())
            }
            _ => Err(BridgeError::InvalidTransition(
                "cannot stall: not Connecting or Live",
            )),
        }
    }

    /// Valid from: `Connecting`, `Live`, `Stalled`.
    pub fn begin_close(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Connecting | Self::Live { .. } | Self::Stalled => {
                *self = Self::Closing;
                Ok(())
            }
            _ => Err(BridgeError::InvalidTransition(
                "cannot close: no session in progress",
            )),
        }
    }

    /// Valid from every phase except `Idle`.
    pub fn finish(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Idle => Err(BridgeError::InvalidTransition(
                "cannot finish: already Idle",
            )),
            _ => {
                *self = Self::Idle;
                Ok(())
            }
        }
    }

    /// Force-reset to `Idle` regardless of current phase.
    pub fn force_idle(&mut self) {
        *self = Self::Idle;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = SessionPhase::Idle;

        phase.begin_connect().unwrap();
        assert_eq!(phase, SessionPhase::Connecting);

        phase.go_live().unwrap();
        assert!(phase.is_live());
        assert!(phase.live_duration().is_some());

        phase.begin_close().unwrap();
        assert_eq!(phase, SessionPhase::Closing);

        phase.finish().unwrap();
        assert!(phase.is_idle());
    }

    #[test]
    fn start_rejected_while_in_progress() {
        for mut phase in [
            SessionPhase::Connecting,
            SessionPhase::Live {
                since: Instant::now(),
            },
            SessionPhase::Stalled,
            SessionPhase::Closing,
        ] {
            let before = phase.clone();
            assert!(phase.begin_connect().is_err());
            assert_eq!(phase, before);
        }
    }

    #[test]
    fn stall_and_recover() {
        let mut phase = SessionPhase::Connecting;
        phase.stall().unwrap();
        assert_eq!(phase, SessionPhase::Stalled);
        phase.go_live().unwrap();
        assert!(phase.is_live());
        phase.stall().unwrap();
        assert_eq!(phase, SessionPhase::Stalled);
    }

    #[test]
    fn cannot_go_live_from_idle_or_closing() {
        assert!(SessionPhase::Idle.go_live().is_err());
        assert!(SessionPhase::Closing.go_live().is_err());
    }

    #[test]
    fn connecting_fails_straight_to_idle() {
        let mut phase = SessionPhase::Connecting;
        phase.finish().unwrap();
        assert!(phase.is_idle());
    }

    #[test]
    fn finish_from_idle_is_rejected() {
        assert!(SessionPhase::Idle.finish().is_err());
    }

    #[test]
    fn force_idle_from_any_state() {
        let mut phase = SessionPhase::Live {
            since: Instant::now(),
        };
        phase.force_idle();
        assert!(phase.is_idle());
    }

    #[test]
    fn status_labels() {
        assert_eq!(SessionPhase::Idle.status_label(), "disconnected");
        assert_eq!(SessionPhase::Connecting.status_label(), "connecting");
        assert_eq!(SessionPhase::Stalled.status_label(), "connecting");
        assert_eq!(SessionPhase::Closing.status_label(), "disconnected");
        assert_eq!(
            SessionPhase::Live {
                since: Instant::now()
            }
            .status_label(),
            "ok"
        );
    }

    #[test]
    fn display_format() {
        assert_eq!(SessionPhase::Idle.to_string(), "Idle");
        assert_eq!(SessionPhase::Stalled.to_string(), "Stalled");
        assert_eq!(SessionPhase::Closing.to_string(), "Closing");
    }

    #[test]
    fn default_phase_is_idle() {
        assert!(SessionPhase::default().is_idle());
    }
}
