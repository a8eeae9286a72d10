use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::fallback::FallbackTimer;
use super::media::{MediaElement, MediaEvent};
use super::state::{CompletionReason, PendingWork, PlaybackCompletion, PlaybackState};
use crate::config::PlaybackConfig;

/// Drives the avatar video and response audio elements
///
/// Exactly one `PlaybackState` is active. Each transition bumps a generation
/// counter and cancels everything the previous state left behind (event
/// watcher, starter task, fallback timer, completion hook), so a late
/// callback from an earlier state can never cause a transition.
///
/// Transitions take effect synchronously. `play()` calls run on a starter
/// task owned by the controller, so a media element that never settles
/// cannot stall the caller.
#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

struct Shared {
    video: Arc<dyn MediaElement>,
    audio: Arc<dyn MediaElement>,
    clips: PlaybackConfig,
    inner: Mutex<Inner>,
}

struct Inner {
    state: PlaybackState,
    generation: u64,
    completion_tx: Option<oneshot::Sender<CompletionReason>>,
    watcher: Option<JoinHandle<()>>,
    starter: Option<JoinHandle<()>>,
    fallback: FallbackTimer,
}

impl Inner {
    /// Cancel leftovers of the current state and open a new generation
    fn begin_transition(&mut self) -> u64 {
        self.generation += 1;
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        if let Some(starter) = self.starter.take() {
            starter.abort();
        }
        self.fallback.cancel();
        self.completion_tx = None;
        self.generation
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.begin_transition();
    }
}

impl PlaybackController {
    pub fn new(
        video: Arc<dyn MediaElement>,
        audio: Arc<dyn MediaElement>,
        clips: PlaybackConfig,
    ) -> Self {
        let fallback = FallbackTimer::new(clips.fallback());
        let controller = Self {
            shared: Arc::new(Shared {
                video,
                audio,
                clips,
                inner: Mutex::new(Inner {
                    state: PlaybackState::Idle,
                    generation: 0,
                    completion_tx: None,
                    watcher: None,
                    starter: None,
                    fallback,
                }),
            }),
        };
        controller.reset_media();
        controller
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn pending(&self) -> PendingWork {
        let inner = self.lock();
        PendingWork {
            completion_hooks: usize::from(inner.completion_tx.is_some()),
            fallback_timers: usize::from(inner.fallback.is_pending()),
        }
    }

    /// Unlock later playback from within a user gesture
    ///
    /// Plays and immediately pauses the idle clip and loads the audio
    /// element. Best effort: failures are logged and the state stays Idle.
    pub fn prime(&self) {
        let mut inner = self.lock();
        if inner.state != PlaybackState::Idle {
            debug!("Not priming media while {:?}", inner.state);
            return;
        }

        self.shared.audio.load();

        let generation = inner.generation;
        if let Some(starter) = inner.starter.take() {
            starter.abort();
        }
        inner.starter = Some(tokio::spawn(prime_video(
            Arc::downgrade(&self.shared),
            generation,
        )));
    }

    /// Loop the thinking clip while a reply is awaited
    pub fn enter_thinking(&self) {
        let mut inner = self.lock();
        let generation = inner.begin_transition();
        debug!("Playback: {:?} -> Thinking", inner.state);
        inner.state = PlaybackState::Thinking;

        let video = &self.shared.video;
        video.set_source(&self.shared.clips.thinking_clip);
        video.set_looping(true);
        video.rewind();

        inner.starter = Some(tokio::spawn(start_thinking(
            Arc::downgrade(&self.shared),
            generation,
        )));
    }

    /// Play the response audio over the talking clip
    ///
    /// The returned completion resolves exactly once, when the audio ends,
    /// fails, or (if it could not start) when the fallback timer runs out.
    pub fn enter_talking(&self, audio_url: &str) -> PlaybackCompletion {
        let (completion_tx, completion_rx) = oneshot::channel();
        let has_audio = !audio_url.trim().is_empty();

        let mut inner = self.lock();
        let generation = inner.begin_transition();
        debug!("Playback: {:?} -> Talking", inner.state);
        inner.state = PlaybackState::Talking;
        inner.completion_tx = Some(completion_tx);

        let video = &self.shared.video;
        video.set_source(&self.shared.clips.talking_clip);
        video.set_looping(true);
        video.rewind();

        // Subscribe before playing so no terminal event is missed
        let audio_events = self.shared.audio.subscribe();
        let video_events = video.subscribe();
        if has_audio {
            self.shared.audio.set_source(audio_url);
            self.shared.audio.rewind();
        }

        inner.watcher = Some(tokio::spawn(watch_talking(
            Arc::downgrade(&self.shared),
            generation,
            audio_events,
            video_events,
        )));

        if has_audio {
            info!("Playing response audio from {}", audio_url);
        } else {
            warn!(
                "No audio URL provided, finishing after {:?}",
                inner.fallback.delay()
            );
            self.arm_fallback_locked(&mut inner, generation);
        }
        inner.starter = Some(tokio::spawn(start_talking(
            Arc::downgrade(&self.shared),
            generation,
            has_audio,
        )));

        PlaybackCompletion::new(completion_rx)
    }

    /// Stop everything and rewind; also the initial state
    ///
    /// Idempotent: repeated calls leave the elements exactly as one call does.
    pub fn enter_idle(&self) {
        let mut inner = self.lock();
        inner.begin_transition();
        if inner.state != PlaybackState::Idle {
            debug!("Playback: {:?} -> Idle", inner.state);
        }
        inner.state = PlaybackState::Idle;
        self.reset_media();
    }

    /// Terminal event for the talking phase of `generation`
    fn complete(&self, generation: u64, reason: CompletionReason) {
        let completion_tx = {
            let mut inner = self.lock();
            if inner.generation != generation || inner.state != PlaybackState::Talking {
                return;
            }
            let completion_tx = inner.completion_tx.take();
            inner.begin_transition();
            inner.state = PlaybackState::Idle;
            self.reset_media();
            completion_tx
        };

        info!("Response playback complete: {:?}", reason);
        if let Some(tx) = completion_tx {
            let _ = tx.send(reason);
        }
    }

    fn arm_fallback(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        self.arm_fallback_locked(&mut inner, generation);
    }

    fn arm_fallback_locked(&self, inner: &mut Inner, generation: u64) {
        let shared = Arc::downgrade(&self.shared);
        inner.fallback.arm(move || async move {
            if let Some(shared) = shared.upgrade() {
                PlaybackController { shared }.complete(generation, CompletionReason::FallbackElapsed);
            }
        });
    }

    /// A `play()` that resolved after a newer transition must not leave
    /// media running in Idle
    fn settle_after_play(&self, generation: u64) {
        let inner = self.lock();
        if inner.generation != generation && inner.state == PlaybackState::Idle {
            debug!("Transition superseded while starting playback");
            self.reset_media();
        }
    }

    fn reset_media(&self) {
        let Shared {
            video,
            audio,
            clips,
            ..
        } = &*self.shared;

        audio.pause();
        audio.rewind();

        video.set_looping(false);
        video.pause();
        video.rewind();
        if !clips.idle_clip.is_empty()
            && video.source().as_deref() != Some(clips.idle_clip.as_str())
        {
            video.set_source(&clips.idle_clip);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Element handles for a starter task, without keeping the controller alive
/// while `play()` is pending
fn elements(shared: &Weak<Shared>) -> Option<(Arc<dyn MediaElement>, Arc<dyn MediaElement>)> {
    shared
        .upgrade()
        .map(|shared| (Arc::clone(&shared.video), Arc::clone(&shared.audio)))
}

fn settle(shared: &Weak<Shared>, generation: u64) {
    if let Some(shared) = shared.upgrade() {
        PlaybackController { shared }.settle_after_play(generation);
    }
}

async fn prime_video(shared: Weak<Shared>, generation: u64) {
    let Some((video, _)) = elements(&shared) else { return };

    match video.play().await {
        Ok(()) => {
            let Some(shared) = shared.upgrade() else { return };
            let controller = PlaybackController { shared };
            let inner = controller.lock();
            if inner.generation == generation {
                video.pause();
                video.rewind();
            }
        }
        Err(e) => debug!("Priming {} failed, continuing: {}", video.name(), e),
    }
}

async fn start_thinking(shared: Weak<Shared>, generation: u64) {
    let Some((video, _)) = elements(&shared) else { return };

    if let Err(e) = video.play().await {
        warn!("{} autoplay blocked, showing first frame of thinking clip: {}", video.name(), e);
    }
    settle(&shared, generation);
}

async fn start_talking(shared: Weak<Shared>, generation: u64, has_audio: bool) {
    let Some((video, audio)) = elements(&shared) else { return };

    let video_start = async {
        if let Err(e) = video.play().await {
            warn!("{} autoplay blocked, showing first frame of talking clip: {}", video.name(), e);
        }
    };
    let audio_start = async {
        if !has_audio {
            return;
        }
        if let Err(e) = audio.play().await {
            warn!("{} playback blocked, falling back to timer: {}", audio.name(), e);
            if let Some(shared) = shared.upgrade() {
                PlaybackController { shared }.arm_fallback(generation);
            }
        }
    };

    tokio::join!(video_start, audio_start);
    settle(&shared, generation);
}

/// Listen for the end of the response audio; restart the talking clip
/// whenever it runs out first
async fn watch_talking(
    shared: Weak<Shared>,
    generation: u64,
    mut audio_events: broadcast::Receiver<MediaEvent>,
    mut video_events: broadcast::Receiver<MediaEvent>,
) {
    let mut video_open = true;

    let reason = loop {
        tokio::select! {
            event = audio_events.recv() => match event {
                Ok(MediaEvent::Ended) => break CompletionReason::Finished,
                Ok(MediaEvent::Error(e)) => {
                    warn!("Response audio playback error: {}", e);
                    break CompletionReason::AudioError(e);
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Audio event listener lagged by {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    break CompletionReason::AudioError("audio element closed".to_string());
                }
            },
            event = video_events.recv(), if video_open => match event {
                Ok(MediaEvent::Ended) => {
                    let Some(shared) = shared.upgrade() else { return };
                    let video = Arc::clone(&shared.video);
                    drop(shared);
                    debug!("Talking clip on {} ended before the audio, replaying", video.name());
                    video.rewind();
                    if let Err(e) = video.play().await {
                        warn!("Could not replay talking clip on {}: {}", video.name(), e);
                    }
                }
                Ok(MediaEvent::Error(e)) => warn!("Talking clip error: {}", e),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => video_open = false,
            },
        }
    };

    if let Some(shared) = shared.upgrade() {
        PlaybackController { shared }.complete(generation, reason);
    }
}
