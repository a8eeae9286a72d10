use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `AVATAR_VOICE__RELAY__WEBHOOK_URL`.
pub const ENV_PREFIX: &str = "AVATAR_VOICE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    pub relay: RelayConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "avatar-voice".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Largest accepted upload, in bytes
    pub max_audio_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            max_audio_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Server-side relay: where utterances are forwarded to
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Remote processing endpoint (workflow engine webhook)
    pub webhook_url: String,

    /// Upper bound on the remote call (default: 300 seconds)
    #[serde(default = "default_relay_timeout_secs")]
    pub timeout_secs: u64,

    /// Multipart field carrying the audio
    #[serde(default = "default_audio_field")]
    pub audio_field: String,

    /// File name attached to the outbound multipart part
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl RelayConfig {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            timeout_secs: default_relay_timeout_secs(),
            audio_field: default_audio_field(),
            file_name: default_file_name(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_relay_timeout_secs() -> u64 {
    300
}

fn default_audio_field() -> String {
    "audio".to_string()
}

fn default_file_name() -> String {
    "audio.webm".to_string()
}

/// Client side: how the front end reaches the local relay
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub relay_url: String,
    /// Slightly above the relay's own bound so the relay reports the timeout
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:3000/relay".to_string(),
            timeout_secs: 310,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub sample_rate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 44100,
        }
    }
}

/// Avatar clips and the blocked-autoplay fallback
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub idle_clip: String,
    pub thinking_clip: String,
    pub talking_clip: String,
    pub fallback_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            idle_clip: "/avatar/idle.mp4".to_string(),
            thinking_clip: "/avatar/thinking.mp4".to_string(),
            talking_clip: "/avatar/talking.mp4".to_string(),
            fallback_secs: 3,
        }
    }
}

impl PlaybackConfig {
    pub fn fallback(&self) -> Duration {
        Duration::from_secs(self.fallback_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub info_dismiss_secs: u64,
    pub error_dismiss_secs: u64,
    pub messages: StatusMessages,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            info_dismiss_secs: 3,
            error_dismiss_secs: 5,
            messages: StatusMessages::default(),
        }
    }
}

impl StatusConfig {
    pub fn info_dismiss(&self) -> Duration {
        Duration::from_secs(self.info_dismiss_secs)
    }

    pub fn error_dismiss(&self) -> Duration {
        Duration::from_secs(self.error_dismiss_secs)
    }
}

/// User-facing strings, overridable for localization
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusMessages {
    pub listening: String,
    pub processing: String,
    pub response_received: String,
    pub microphone_unavailable: String,
    pub timed_out: String,
    pub unreachable: String,
    pub unexpected_format: String,
    pub no_audio_captured: String,
    pub generic_error: String,
}

impl Default for StatusMessages {
    fn default() -> Self {
        Self {
            listening: "Listening...".to_string(),
            processing: "Sending to the assistant and waiting for a reply...".to_string(),
            response_received: "Response received".to_string(),
            microphone_unavailable: "Cannot access the microphone".to_string(),
            timed_out: "Processing took too long, please try again".to_string(),
            unreachable: "Cannot reach the server".to_string(),
            unexpected_format: "The server replied in an unexpected format".to_string(),
            no_audio_captured: "No audio was captured".to_string(),
            generic_error: "Something went wrong".to_string(),
        }
    }
}

impl Config {
    /// Load from `path` (any extension the `config` crate understands),
    /// then apply `AVATAR_VOICE__*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
