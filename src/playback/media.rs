use thiserror::Error;
use tokio::sync::broadcast;

/// Terminal signals a media element reports while playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// Reached the end of the source
    Ended,
    /// Failed to load or decode mid-stream
    Error(String),
}

/// The host refused to start playback (autoplay policy, missing gesture)
#[derive(Debug, Clone, Error)]
#[error("playback blocked on {element}: {reason}")]
pub struct PlaybackBlocked {
    pub element: String,
    pub reason: String,
}

impl PlaybackBlocked {
    pub fn new(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            reason: reason.into(),
        }
    }
}

/// A playable video or audio element
///
/// Mirrors the handful of operations the avatar needs from an HTML media
/// element. Only `play` is asynchronous; everything else takes effect
/// immediately. `play` may stay pending while a source loads.
#[async_trait::async_trait]
pub trait MediaElement: Send + Sync {
    fn set_source(&self, src: &str);

    fn source(&self) -> Option<String>;

    fn set_looping(&self, looping: bool);

    /// Start playback; resolves once playback has begun
    async fn play(&self) -> Result<(), PlaybackBlocked>;

    fn pause(&self);

    /// Seek to the start
    fn rewind(&self);

    /// Reset the element and begin fetching its current source
    fn load(&self);

    /// Subscribe to `Ended`/`Error` events
    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;

    /// Element name for logging
    fn name(&self) -> &str;
}
