use serde::Serialize;
use tokio::sync::oneshot;

/// Which avatar clip is showing and whether response audio is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Thinking,
    Talking,
}

/// Why a talking phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReason {
    /// Response audio played to the end
    Finished,
    /// Response audio failed mid-stream
    AudioError(String),
    /// Audio was blocked or missing; the fallback timer ran out
    FallbackElapsed,
}

/// Resolves once the talking phase it was issued for ends
///
/// Yields `None` if that phase was superseded by another transition before
/// finishing (cancel, a failure path, a new response).
#[derive(Debug)]
pub struct PlaybackCompletion {
    rx: oneshot::Receiver<CompletionReason>,
}

impl PlaybackCompletion {
    pub(crate) fn new(rx: oneshot::Receiver<CompletionReason>) -> Self {
        Self { rx }
    }

    pub async fn wait(self) -> Option<CompletionReason> {
        self.rx.await.ok()
    }
}

/// Outstanding asynchronous work owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingWork {
    pub completion_hooks: usize,
    pub fallback_timers: usize,
}
