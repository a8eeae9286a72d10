use anyhow::Result;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::messages::relay_failure_message;
use super::status::SessionStatus;
use crate::capture::{CaptureConstraints, CaptureDevice, Recorder, Utterance};
use crate::config::{Config, StatusConfig};
use crate::playback::{CompletionReason, MediaElement, PlaybackController};
use crate::relay::{Relay, RelayClient, RelayResult};
use crate::timer::{OneShot, Ticker};

/// Resolution of the processing timer shown while a reply is awaited
const ELAPSED_TICK: Duration = Duration::from_secs(1);

/// Where the conversation turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Recording,
    AwaitingResponse,
    /// Response audio is playing
    Responding,
}

/// What a record/stop gesture did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    RecordingStarted,
    RecordingStopped,
    /// Microphone unavailable; the session stays idle
    RecordingFailed(String),
    /// A turn is being processed
    Ignored,
}

/// Sequences recorder, relay and playback for one conversation turn at a
/// time
///
/// Owns the `SessionStatus` and is the only component that triggers
/// playback transitions. Every failure path ends in `SessionPhase::Idle`
/// with the session ready for the next gesture.
#[derive(Clone)]
pub struct SessionOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    playback: PlaybackController,
    relay: Arc<dyn Relay>,
    config: StatusConfig,
    status_tx: watch::Sender<SessionStatus>,
    inner: Mutex<Inner>,
}

struct Inner {
    phase: SessionPhase,
    /// Bumped per turn and on cancel; late callbacks from older turns are dropped
    turn: u64,
    status: SessionStatus,
    recorder: Recorder,
    processing_started_at: Option<Instant>,
    elapsed: Ticker,
    dismiss: OneShot,
    relay_task: Option<JoinHandle<()>>,
    playback_task: Option<JoinHandle<()>>,
}

impl Inner {
    fn abort_tasks(&mut self) {
        if let Some(task) = self.relay_task.take() {
            task.abort();
            info!("Aborted in-flight relay call");
        }
        if let Some(task) = self.playback_task.take() {
            task.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

impl SessionOrchestrator {
    pub fn new(
        recorder: Recorder,
        playback: PlaybackController,
        relay: Arc<dyn Relay>,
        config: StatusConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::default());

        Self {
            shared: Arc::new(Shared {
                playback,
                relay,
                config,
                status_tx,
                inner: Mutex::new(Inner {
                    phase: SessionPhase::Idle,
                    turn: 0,
                    status: SessionStatus::default(),
                    recorder,
                    processing_started_at: None,
                    elapsed: Ticker::new(),
                    dismiss: OneShot::new(),
                    relay_task: None,
                    playback_task: None,
                }),
            }),
        }
    }

    /// Wire up a client session that talks to the local relay endpoint
    pub fn from_config(
        config: &Config,
        device: Box<dyn CaptureDevice>,
        video: Arc<dyn MediaElement>,
        audio: Arc<dyn MediaElement>,
    ) -> Result<Self> {
        let recorder = Recorder::new(device, CaptureConstraints::from(&config.capture));
        let playback = PlaybackController::new(video, audio, config.playback.clone());
        let relay = Arc::new(RelayClient::new(&config.client)?);

        Ok(Self::new(recorder, playback, relay, config.status.clone()))
    }

    /// Latest status snapshot
    pub fn status(&self) -> SessionStatus {
        self.shared.status_tx.borrow().clone()
    }

    /// Status updates, one snapshot per transition
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.shared.inner.lock().await.phase
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.shared.playback
    }

    /// Whether the processing timer is currently counting
    pub async fn elapsed_counter_running(&self) -> bool {
        self.shared.inner.lock().await.elapsed.is_running()
    }

    /// Record/stop toggle
    pub async fn handle_gesture(&self) -> GestureOutcome {
        let mut inner = self.shared.inner.lock().await;

        if inner.status.is_processing() {
            debug!("Gesture ignored while processing");
            return GestureOutcome::Ignored;
        }

        match inner.phase {
            SessionPhase::Idle => self.start_recording(&mut inner).await,
            SessionPhase::Recording => self.stop_recording(&mut inner).await,
            SessionPhase::AwaitingResponse | SessionPhase::Responding => {
                debug!("Gesture ignored in phase {:?}", inner.phase);
                GestureOutcome::Ignored
            }
        }
    }

    /// Abort the in-flight turn and return to idle immediately
    pub async fn cancel(&self) {
        let mut inner = self.shared.inner.lock().await;
        self.reset(&mut inner).await;
        info!("Session cancelled");
    }

    /// Teardown: cancel everything and release the microphone
    pub async fn shutdown(&self) {
        let mut inner = self.shared.inner.lock().await;
        self.reset(&mut inner).await;
        inner.dismiss.cancel();
        self.update(&mut inner, SessionStatus::dismiss_message);
        info!("Session shut down");
    }

    async fn start_recording(&self, inner: &mut Inner) -> GestureOutcome {
        inner.dismiss.cancel();
        self.shared.playback.prime();

        match inner.recorder.start().await {
            Ok(()) => {
                inner.phase = SessionPhase::Recording;
                let message = &self.shared.config.messages.listening;
                self.update(inner, |s| s.recording_started(message));
                GestureOutcome::RecordingStarted
            }
            Err(e) => {
                error!("Error starting recording: {}", e);
                let message = format!(
                    "{}: {}",
                    self.shared.config.messages.microphone_unavailable, e
                );
                self.update(inner, |s| s.recording_failed(message.clone()));
                self.schedule_dismiss(inner, self.shared.config.error_dismiss());
                GestureOutcome::RecordingFailed(message)
            }
        }
    }

    async fn stop_recording(&self, inner: &mut Inner) -> GestureOutcome {
        inner.turn += 1;
        let turn = inner.turn;
        inner.phase = SessionPhase::AwaitingResponse;
        inner.dismiss.cancel();

        let message = &self.shared.config.messages.processing;
        self.update(inner, |s| s.processing_started(message));

        let stopped = inner.recorder.stop().await;
        self.start_elapsed_counter(inner);
        self.shared.playback.enter_thinking();

        match stopped {
            Ok(Some(utterance)) if !utterance.is_empty() => {
                self.dispatch(inner, turn, utterance);
            }
            Ok(_) => {
                warn!("Recording produced no audio");
                let message = self.shared.config.messages.no_audio_captured.clone();
                self.fail_turn(inner, message);
            }
            Err(e) => {
                error!("Failed to finalize recording: {}", e);
                let message = format!("{}: {}", self.shared.config.messages.generic_error, e);
                self.fail_turn(inner, message);
            }
        }

        GestureOutcome::RecordingStopped
    }

    /// Send the utterance in the background; the result re-enters through
    /// `on_relay_result`
    fn dispatch(&self, inner: &mut Inner, turn: u64, utterance: Utterance) {
        let relay = Arc::clone(&self.shared.relay);
        let shared = Arc::downgrade(&self.shared);

        inner.relay_task = Some(tokio::spawn(async move {
            let result = relay.send(utterance).await;
            if let Some(shared) = shared.upgrade() {
                SessionOrchestrator { shared }
                    .on_relay_result(turn, result)
                    .await;
            }
        }));
    }

    async fn on_relay_result(&self, turn: u64, result: RelayResult) {
        let mut inner = self.shared.inner.lock().await;
        if inner.turn != turn || inner.phase != SessionPhase::AwaitingResponse {
            debug!("Dropping relay result of a superseded turn");
            return;
        }

        // This task owns the handle being cleared; detach rather than abort
        inner.relay_task = None;
        inner.elapsed.stop();
        inner.processing_started_at = None;

        match result.into_outcome() {
            Ok(audio_url) => {
                info!("Received audio URL: {}", audio_url);
                inner.phase = SessionPhase::Responding;
                let message = &self.shared.config.messages.response_received;
                self.update(&mut inner, |s| s.response_ready(message));
                self.schedule_dismiss(&mut inner, self.shared.config.info_dismiss());

                let completion = self.shared.playback.enter_talking(&audio_url);
                let shared = Arc::downgrade(&self.shared);
                inner.playback_task = Some(tokio::spawn(async move {
                    let reason = completion.wait().await;
                    if let Some(shared) = shared.upgrade() {
                        SessionOrchestrator { shared }
                            .on_playback_complete(turn, reason)
                            .await;
                    }
                }));
            }
            Err(failure) => {
                error!("Relay call failed: {}", failure);
                let message = relay_failure_message(&self.shared.config.messages, &failure);
                self.fail_turn(&mut inner, message);
            }
        }
    }

    async fn on_playback_complete(&self, turn: u64, reason: Option<CompletionReason>) {
        let mut inner = self.shared.inner.lock().await;
        if inner.turn != turn || inner.phase != SessionPhase::Responding {
            return;
        }

        match reason {
            Some(reason) => info!("Turn {} finished: {:?}", turn, reason),
            None => debug!("Turn {} playback superseded", turn),
        }
        inner.playback_task = None;
        inner.phase = SessionPhase::Idle;
        self.update(&mut inner, SessionStatus::playback_finished);
    }

    /// Failure path: back to idle with an error message
    fn fail_turn(&self, inner: &mut Inner, message: String) {
        inner.elapsed.stop();
        inner.processing_started_at = None;
        self.shared.playback.enter_idle();
        inner.phase = SessionPhase::Idle;
        self.update(inner, |s| s.processing_failed(message));
        self.schedule_dismiss(inner, self.shared.config.error_dismiss());
    }

    async fn reset(&self, inner: &mut Inner) {
        inner.abort_tasks();
        inner.elapsed.stop();
        inner.processing_started_at = None;
        if inner.recorder.is_recording() {
            // Discarded; the recorder releases the microphone either way
            if let Err(e) = inner.recorder.stop().await {
                warn!("Failed to stop recorder: {}", e);
            }
        }
        self.shared.playback.enter_idle();
        inner.turn += 1;
        inner.phase = SessionPhase::Idle;
        self.update(inner, SessionStatus::cancelled);
    }

    fn start_elapsed_counter(&self, inner: &mut Inner) {
        inner.processing_started_at = Some(Instant::now());
        let shared = Arc::downgrade(&self.shared);

        inner.elapsed.start(ELAPSED_TICK, move || {
            let shared = Weak::clone(&shared);
            async move {
                let Some(shared) = shared.upgrade() else { return };
                let orchestrator = SessionOrchestrator { shared };
                let mut inner = orchestrator.shared.inner.lock().await;
                if let Some(started_at) = inner.processing_started_at {
                    let elapsed = started_at.elapsed().as_secs();
                    orchestrator.update(&mut inner, |s| s.tick(elapsed));
                }
            }
        });
    }

    /// Clear the status message after `delay`, replacing any pending clear
    fn schedule_dismiss(&self, inner: &mut Inner, delay: Duration) {
        let shared = Arc::downgrade(&self.shared);

        inner.dismiss.arm(delay, move || async move {
            let Some(shared) = shared.upgrade() else { return };
            let orchestrator = SessionOrchestrator { shared };
            let mut inner = orchestrator.shared.inner.lock().await;
            orchestrator.update(&mut inner, SessionStatus::dismiss_message);
        });
    }

    fn update(&self, inner: &mut Inner, apply: impl FnOnce(&mut SessionStatus)) {
        apply(&mut inner.status);
        self.shared.status_tx.send_replace(inner.status.clone());
    }
}
