//! Configuration for the bridge service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cgbridge_core::{InputTiming, ScreenSize, SessionConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Game session parameters and credentials.
    pub session: SessionSection,
    /// Signaling endpoint.
    pub signaling: SignalingConfig,
    /// Lifecycle timeouts.
    pub timing: TimingConfig,
    /// Input pacing.
    pub input: InputConfig,
    /// Screenshot encoding.
    pub image: ImageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
}

/// Game session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Game identifier sent during signaling.
    pub game_id: String,
    /// Requested stream width in pixels.
    pub width: u32,
    /// Requested stream height in pixels.
    pub height: u32,
    /// File the access token is stored in.
    pub token_file: PathBuf,
    /// Prefix put in front of the phone number for login.
    pub phone_prefix: String,
    /// Phone number for first-run login. Empty disables login.
    pub phone_number: String,
    /// Start a session as soon as the service is up.
    pub autostart: bool,
}

/// Signaling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// WebSocket endpoint of the signaling service.
    pub url: String,
    /// Connect + offer timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

/// Session lifecycle timeouts, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub ready_timeout_ms: u64,
    pub track_grace_ms: u64,
    pub teardown_step_timeout_ms: u64,
    pub max_staleness_ms: u64,
    pub health_poll_ms: u64,
}

/// Input pacing, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub click_settle_ms: u64,
    pub text_interval_ms: u64,
    pub swipe_sample_ms: u64,
    pub min_swipe_samples: u32,
    /// Lift the pointer when a swipe is cut short by shutdown.
    pub release_on_cancel: bool,
}

/// Screenshot encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Optional log file path. If empty, logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 22888,
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            game_id: "mrfz".into(),
            width: 1280,
            height: 720,
            token_file: PathBuf::from("token"),
            phone_prefix: "86-".into(),
            phone_number: String::new(),
            autostart: true,
        }
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8443/signaling".into(),
            connect_timeout_ms: 10_000,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: 20_000,
            track_grace_ms: 3_000,
            teardown_step_timeout_ms: 5_000,
            max_staleness_ms: 10_000,
            health_poll_ms: 1_000,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            click_settle_ms: 50,
            text_interval_ms: 50,
            swipe_sample_ms: 30,
            min_swipe_samples: 5,
            release_on_cancel: false,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl BridgeConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Login identity: prefix + number, or `None` when no number is set.
    pub fn login_phone(&self) -> Option<String> {
        let number = self.session.phone_number.trim();
        (!number.is_empty()).then(|| format!("{}{number}", self.session.phone_prefix))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.signaling.connect_timeout_ms.max(1))
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.image.jpeg_quality.clamp(1, 100)
    }

    /// Convert into the core session configuration, clamping zero sizes
    /// and intervals to safe minimums.
    pub fn to_session_config(&self) -> SessionConfig {
        let ms = |v: u64| Duration::from_millis(v.max(1));
        let t = &self.timing;
        let i = &self.input;
        SessionConfig {
            game_id: self.session.game_id.clone(),
            screen: ScreenSize::new(self.session.width.max(1), self.session.height.max(1))
                .unwrap_or(ScreenSize {
                    width: 1280,
                    height: 720,
                }),
            phone_number: self.login_phone(),
            ready_timeout: ms(t.ready_timeout_ms),
            track_grace: Duration::from_millis(t.track_grace_ms),
            teardown_step_timeout: ms(t.teardown_step_timeout_ms),
            health_poll: ms(t.health_poll_ms),
            max_staleness: ms(t.max_staleness_ms),
            input: InputTiming {
                click_settle: Duration::from_millis(i.click_settle_ms),
                text_interval: Duration::from_millis(i.text_interval_ms),
                swipe_sample_interval: ms(i.swipe_sample_ms),
                min_swipe_samples: i.min_swipe_samples.max(1),
                release_on_cancel: i.release_on_cancel,
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&BridgeConfig::default()).unwrap();
        assert!(text.contains("port = 22888"));
        assert!(text.contains("game_id = \"mrfz\""));
        assert!(text.contains("[timing]"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: BridgeConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [session]
            phone_number = "13800000000"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.session.width, 1280);
        assert_eq!(cfg.login_phone().as_deref(), Some("86-13800000000"));
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = BridgeConfig::load(Path::new("/nonexistent/cgbridge.toml"));
        assert_eq!(cfg.server.port, 22888);
        assert!(cfg.session.autostart);
    }

    #[test]
    fn session_config_mirrors_defaults() {
        assert_eq!(
            BridgeConfig::default().to_session_config(),
            SessionConfig::default()
        );
    }

    #[test]
    fn to_session_config_clamps() {
        let mut cfg = BridgeConfig::default();
        cfg.session.width = 0;
        cfg.timing.health_poll_ms = 0;
        cfg.input.min_swipe_samples = 0;
        cfg.image.jpeg_quality = 0;
        let s = cfg.to_session_config();
        assert_eq!(s.screen.width, 1);
        assert_eq!(s.health_poll, Duration::from_millis(1));
        assert_eq!(s.input.min_swipe_samples, 1);
        assert_eq!(cfg.jpeg_quality(), 1);
        assert_eq!(s.phone_number, None);
    }
}
