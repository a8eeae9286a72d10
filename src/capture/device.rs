use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::CaptureConfig;

/// Microphone capture parameters requested when opening a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Requested sample rate in Hz
    pub sample_rate: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 44100,
        }
    }
}

impl From<&CaptureConfig> for CaptureConstraints {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            echo_cancellation: config.echo_cancellation,
            noise_suppression: config.noise_suppression,
            sample_rate: config.sample_rate,
        }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device available")]
    NoDevice,

    #[error("capture device error: {0}")]
    Device(String),
}

/// Microphone capture device
///
/// Implementations wrap whatever the host platform offers (a browser media
/// stream plus recorder, a native input device, a file for tests). Encoded
/// fragments are delivered in arrival order over the returned channel.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the device and start producing fragments
    async fn open(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<mpsc::Receiver<Bytes>, CaptureError>;

    /// Stop producing: deliver any buffered data, then close the stream
    ///
    /// Recorders that only emit on stop (no timeslice) send their whole
    /// payload here. The receiver returned by `open` must see `None` once
    /// the final fragment is sent.
    async fn finish(&mut self);

    /// Stop all tracks and release the device
    ///
    /// Must be safe to call when nothing is held.
    fn release(&mut self);

    /// Check if the device is currently held
    fn is_capturing(&self) -> bool;

    /// Container type of the produced fragments
    fn mime_type(&self) -> &str {
        "audio/webm"
    }

    /// Device name for logging
    fn name(&self) -> &str;
}
