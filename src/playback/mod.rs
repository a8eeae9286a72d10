//! Avatar video and response audio playback
//!
//! `PlaybackController` owns one video and one audio `MediaElement` and moves
//! them between the idle, thinking and talking presentations.

mod controller;
mod fallback;
mod media;
mod state;

pub use controller::PlaybackController;
pub use fallback::FallbackTimer;
pub use media::{MediaElement, MediaEvent, PlaybackBlocked};
pub use state::{CompletionReason, PendingWork, PlaybackCompletion, PlaybackState};
