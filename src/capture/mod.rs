//! Microphone capture
//!
//! A `Recorder` drives a `CaptureDevice` for one utterance at a time and
//! guarantees the device is released on every exit path.

mod device;
mod recorder;
mod utterance;

pub use device::{CaptureConstraints, CaptureDevice, CaptureError};
pub use recorder::{Recorder, RecorderError, FLUSH_TIMEOUT};
pub use utterance::{Utterance, DEFAULT_FILE_NAME};
