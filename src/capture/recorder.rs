use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use super::device::{CaptureConstraints, CaptureDevice, CaptureError};
use super::utterance::Utterance;

/// How long `stop` waits for the device to flush and close its stream
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum RecorderError {
    /// Microphone access denied or no device present
    #[error("{0}")]
    Permission(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("capture failed: {0}")]
    Capture(String),
}

impl From<CaptureError> for RecorderError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(_) | CaptureError::NoDevice => {
                RecorderError::Permission(err.to_string())
            }
            CaptureError::Device(msg) => RecorderError::Capture(msg),
        }
    }
}

/// An in-progress capture: the fragment collector and its stop signal
struct ActiveCapture {
    stop_tx: oneshot::Sender<()>,
    collector: JoinHandle<Vec<Bytes>>,
}

/// Records one utterance at a time from a capture device
pub struct Recorder {
    device: Box<dyn CaptureDevice>,
    constraints: CaptureConstraints,
    active: Option<ActiveCapture>,
}

impl Recorder {
    pub fn new(device: Box<dyn CaptureDevice>, constraints: CaptureConstraints) -> Self {
        Self {
            device,
            constraints,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Acquire the microphone and start collecting fragments
    pub async fn start(&mut self) -> Result<(), RecorderError> {
        if self.active.is_some() {
            warn!("Recording already started");
            return Err(RecorderError::AlreadyRecording);
        }

        if self.device.is_capturing() {
            warn!("Capture device {} still held, releasing it first", self.device.name());
            self.device.release();
        }

        info!(
            "Opening capture device {} ({} Hz, echo_cancellation={}, noise_suppression={})",
            self.device.name(),
            self.constraints.sample_rate,
            self.constraints.echo_cancellation,
            self.constraints.noise_suppression
        );

        let fragments_rx = match self.device.open(&self.constraints).await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to open capture device: {}", e);
                // Partial acquisition must not leak tracks
                self.device.release();
                return Err(e.into());
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let collector = tokio::spawn(collect_fragments(fragments_rx, stop_rx));

        self.active = Some(ActiveCapture { stop_tx, collector });
        info!("Recording started");

        Ok(())
    }

    /// Finalize the buffer into an utterance and release the device.
    ///
    /// The device is asked to flush first, so a final fragment delivered on
    /// stop is part of the utterance. Returns `Ok(None)` when nothing is
    /// being recorded.
    pub async fn stop(&mut self) -> Result<Option<Utterance>, RecorderError> {
        let Some(mut active) = self.active.take() else {
            return Ok(None);
        };

        let deadline = Instant::now() + FLUSH_TIMEOUT;
        if timeout_at(deadline, self.device.finish()).await.is_err() {
            warn!("Capture device {} did not finish in time", self.device.name());
        }

        let collected = match timeout_at(deadline, &mut active.collector).await {
            Ok(collected) => collected,
            Err(_) => {
                warn!(
                    "Capture device {} did not close its stream within {:?}, keeping what arrived",
                    self.device.name(),
                    FLUSH_TIMEOUT
                );
                // The collector may already be gone if the stream closed meanwhile
                let _ = active.stop_tx.send(());
                active.collector.await
            }
        };

        self.device.release();

        let fragments = collected.map_err(|e| {
            error!("Fragment collector failed: {}", e);
            RecorderError::Capture(format!("fragment collector failed: {}", e))
        })?;

        let utterance = Utterance::from_fragments(fragments, self.device.mime_type());
        info!("Recording stopped, utterance size: {} bytes", utterance.len());

        Ok(Some(utterance))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.collector.abort();
            self.device.release();
        }
    }
}

/// Accumulate non-empty fragments until the stream closes, or until a
/// forced stop drains whatever is already buffered
async fn collect_fragments(
    mut fragments_rx: mpsc::Receiver<Bytes>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Vec<Bytes> {
    let mut fragments = Vec::new();

    loop {
        tokio::select! {
            fragment = fragments_rx.recv() => match fragment {
                Some(fragment) if !fragment.is_empty() => fragments.push(fragment),
                Some(_) => {}
                None => break,
            },
            _ = &mut stop_rx => {
                // Keep whatever was already delivered
                while let Ok(fragment) = fragments_rx.try_recv() {
                    if !fragment.is_empty() {
                        fragments.push(fragment);
                    }
                }
                break;
            }
        }
    }

    fragments
}
