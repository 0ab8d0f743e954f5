//! Session lifecycle.
//!
//! | Module         | Purpose                                         |
//! |----------------|-------------------------------------------------|
//! | [`phase`]      | `SessionPhase` and its validated transitions    |
//! | [`config`]     | `SessionConfig` timeouts, screen, input pacing  |
//! | [`controller`] | `SessionController`, the single-session owner   |

pub mod config;
pub mod controller;
pub mod phase;

pub use config::SessionConfig;
pub use controller::{LiveSession, SessionController, SessionState};
pub use phase::SessionPhase;
