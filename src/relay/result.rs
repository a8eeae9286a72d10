use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Which of the failure paths produced a `RelayFailure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Remote endpoint answered with a non-2xx status
    Upstream,
    /// JSON reply without a usable `audioUrl`
    NoAudio,
    /// Neither JSON nor a bare URL
    Malformed,
    /// No reply within the configured bound
    Timeout,
    /// Network failure or aborted request
    Transport,
    /// Failure reported by the relay without a more specific kind
    Remote,
}

/// Typed reason a relay call did not yield playable audio
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RelayFailure {
    kind: FailureKind,
    message: String,
}

impl RelayFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// `"<status> <body-prefix>"`
    pub fn upstream(status: u16, body_prefix: &str) -> Self {
        let body_prefix = body_prefix.trim();
        let message = if body_prefix.is_empty() {
            status.to_string()
        } else {
            format!("{} {}", status, body_prefix)
        };
        Self::new(FailureKind::Upstream, message)
    }

    pub fn no_audio() -> Self {
        Self::new(FailureKind::NoAudio, "no audio in response")
    }

    pub fn malformed() -> Self {
        Self::new(FailureKind::Malformed, "malformed response")
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("request timed out after {} seconds", after.as_secs()),
        )
    }

    pub fn transport(detail: impl std::fmt::Display) -> Self {
        Self::new(FailureKind::Transport, format!("transport error: {}", detail))
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Whether `url` can be handed to the audio element
pub fn is_usable_audio_url(url: &str) -> bool {
    !url.is_empty() && url.starts_with("http")
}

/// Normalized outcome of one relay call
///
/// A successful result always carries a usable audio URL; a failed one never
/// does. Fields are private so the pairing cannot be broken after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResult {
    outcome: Result<String, RelayFailure>,
    raw: Option<Value>,
}

impl RelayResult {
    /// Success if `url` is usable, otherwise a `NoAudio` failure
    pub fn audio(url: impl Into<String>, raw: Option<Value>) -> Self {
        let url = url.into();
        if is_usable_audio_url(&url) {
            Self {
                outcome: Ok(url),
                raw,
            }
        } else {
            Self::failure(RelayFailure::no_audio(), raw)
        }
    }

    pub fn failure(failure: RelayFailure, raw: Option<Value>) -> Self {
        Self {
            outcome: Err(failure),
            raw,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn audio_url(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn failure_reason(&self) -> Option<&RelayFailure> {
        self.outcome.as_ref().err()
    }

    pub fn error(&self) -> Option<&str> {
        self.failure_reason().map(RelayFailure::message)
    }

    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn into_outcome(self) -> Result<String, RelayFailure> {
        self.outcome
    }
}
