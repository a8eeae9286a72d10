pub mod capture;
pub mod config;
pub mod http;
pub mod playback;
pub mod relay;
pub mod session;
pub mod timer;

pub use capture::{CaptureConstraints, CaptureDevice, CaptureError, Recorder, RecorderError, Utterance};
pub use config::Config;
pub use http::{create_router, AppState};
pub use playback::{
    CompletionReason, MediaElement, MediaEvent, PlaybackBlocked, PlaybackCompletion,
    PlaybackController, PlaybackState,
};
pub use relay::{
    classify, FailureKind, Relay, RelayClient, RelayFailure, RelayResponse, RelayResult,
    UpstreamForwarder,
};
pub use session::{GestureOutcome, SessionOrchestrator, SessionPhase, SessionStatus};
