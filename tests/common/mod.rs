// Shared test doubles for the capture, media and relay seams
#![allow(dead_code)]

use avatar_voice::capture::{CaptureConstraints, CaptureDevice, CaptureError, Recorder, Utterance};
use avatar_voice::config::{PlaybackConfig, StatusConfig};
use avatar_voice::playback::{MediaElement, MediaEvent, PlaybackBlocked, PlaybackController};
use avatar_voice::relay::{Relay, RelayResult};
use avatar_voice::session::SessionOrchestrator;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

// ============================================================================
// Media
// ============================================================================

/// Observable state of a fake media element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSnapshot {
    pub source: Option<String>,
    pub looping: bool,
    pub playing: bool,
    pub at_start: bool,
}

pub struct FakeMedia {
    name: String,
    state: Mutex<MediaSnapshot>,
    blocked: AtomicBool,
    stalled: AtomicBool,
    play_calls: AtomicUsize,
    loads: AtomicUsize,
    events: broadcast::Sender<MediaEvent>,
}

impl FakeMedia {
    pub fn new(name: &str) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            name: name.to_string(),
            state: Mutex::new(MediaSnapshot {
                at_start: true,
                ..Default::default()
            }),
            blocked: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            play_calls: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            events,
        })
    }

    /// Make every subsequent `play()` fail as if autoplay were refused
    pub fn block_autoplay(&self) {
        self.blocked.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent `play()` stay pending, like a source that
    /// never finishes loading
    pub fn stall_play(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MediaSnapshot {
        self.state.lock().unwrap().clone()
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: MediaEvent) {
        if event == MediaEvent::Ended {
            self.state.lock().unwrap().playing = false;
        }
        let _ = self.events.send(event);
    }
}

#[async_trait::async_trait]
impl MediaElement for FakeMedia {
    fn set_source(&self, src: &str) {
        let mut state = self.state.lock().unwrap();
        state.source = Some(src.to_string());
        state.playing = false;
        state.at_start = true;
    }

    fn source(&self) -> Option<String> {
        self.state.lock().unwrap().source.clone()
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().unwrap().looping = looping;
    }

    async fn play(&self) -> Result<(), PlaybackBlocked> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.blocked.load(Ordering::SeqCst) {
            return Err(PlaybackBlocked::new(&self.name, "NotAllowedError"));
        }
        let mut state = self.state.lock().unwrap();
        state.playing = true;
        state.at_start = false;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().unwrap().playing = false;
    }

    fn rewind(&self) {
        self.state.lock().unwrap().at_start = true;
    }

    fn load(&self) {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.at_start = true;
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub fn test_clips() -> PlaybackConfig {
    PlaybackConfig {
        idle_clip: "idle.mp4".to_string(),
        thinking_clip: "thinking.mp4".to_string(),
        talking_clip: "talking.mp4".to_string(),
        fallback_secs: 3,
    }
}

// ============================================================================
// Capture
// ============================================================================

pub enum DeviceBehavior {
    /// Grant access and deliver these fragments while recording
    Grant(Vec<Bytes>),
    /// Grant access but deliver everything in one fragment on stop
    DeliverOnStop(Bytes),
    /// Grant access, deliver these fragments, and never close the stream
    /// until released
    Lingering(Vec<Bytes>),
    Deny,
    Missing,
}

/// What the fake device saw, shared with the test after the device moves
#[derive(Default)]
pub struct DeviceLog {
    pub opens: AtomicUsize,
    pub finishes: AtomicUsize,
    pub releases: AtomicUsize,
    pub held: AtomicBool,
    pub constraints: Mutex<Option<CaptureConstraints>>,
}

impl DeviceLog {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn finishes(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

pub struct FakeDevice {
    behavior: DeviceBehavior,
    log: Arc<DeviceLog>,
    stream: Option<mpsc::Sender<Bytes>>,
    /// Tracks stay held after the stream closes, until `release`
    held_stream: bool,
}

impl FakeDevice {
    pub fn new(behavior: DeviceBehavior) -> (Box<Self>, Arc<DeviceLog>) {
        let log = Arc::new(DeviceLog::default());
        let device = Box::new(Self {
            behavior,
            log: Arc::clone(&log),
            stream: None,
            held_stream: false,
        });
        (device, log)
    }

    /// Device whose tracks are still held from an earlier capture
    pub fn left_open(mut self: Box<Self>) -> Box<Self> {
        self.held_stream = true;
        self.log.held.store(true, Ordering::SeqCst);
        self
    }

    pub fn granting(fragments: &[&'static str]) -> (Box<Self>, Arc<DeviceLog>) {
        Self::new(DeviceBehavior::Grant(
            fragments.iter().map(|f| Bytes::from_static(f.as_bytes())).collect(),
        ))
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FakeDevice {
    async fn open(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<mpsc::Receiver<Bytes>, CaptureError> {
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        *self.log.constraints.lock().unwrap() = Some(constraints.clone());

        let preloaded = match &self.behavior {
            DeviceBehavior::Grant(fragments) | DeviceBehavior::Lingering(fragments) => {
                fragments.clone()
            }
            DeviceBehavior::DeliverOnStop(_) => Vec::new(),
            DeviceBehavior::Deny => {
                return Err(CaptureError::PermissionDenied(
                    "NotAllowedError: Permission denied".to_string(),
                ))
            }
            DeviceBehavior::Missing => return Err(CaptureError::NoDevice),
        };

        let (tx, rx) = mpsc::channel(64);
        for fragment in preloaded {
            tx.try_send(fragment)
                .map_err(|e| CaptureError::Device(e.to_string()))?;
        }
        self.stream = Some(tx);
        self.held_stream = true;
        self.log.held.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn finish(&mut self) {
        self.log.finishes.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            DeviceBehavior::DeliverOnStop(payload) => {
                if let Some(tx) = self.stream.take() {
                    let _ = tx.send(payload.clone()).await;
                }
            }
            DeviceBehavior::Lingering(_) => {}
            _ => self.stream = None,
        }
    }

    fn release(&mut self) {
        self.stream = None;
        self.held_stream = false;
        self.log.held.store(false, Ordering::SeqCst);
        self.log.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn is_capturing(&self) -> bool {
        self.held_stream
    }

    fn name(&self) -> &str {
        "fake-microphone"
    }
}

// ============================================================================
// Relay
// ============================================================================

/// Relay that answers with a fixed result after a delay
pub struct ScriptedRelay {
    reply: Option<RelayResult>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub received_bytes: Mutex<Vec<u8>>,
    pub aborted: Arc<AtomicBool>,
}

impl ScriptedRelay {
    pub fn replying(reply: RelayResult, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply),
            delay,
            calls: AtomicUsize::new(0),
            received_bytes: Mutex::new(Vec::new()),
            aborted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Never answers
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            received_bytes: Mutex::new(Vec::new()),
            aborted: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Flags the call as aborted if its future is dropped before finishing
struct AbortGuard {
    aborted: Arc<AtomicBool>,
    finished: bool,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.aborted.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait::async_trait]
impl Relay for ScriptedRelay {
    async fn send(&self, utterance: Utterance) -> RelayResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.received_bytes.lock().unwrap() = utterance.data().to_vec();

        let mut guard = AbortGuard {
            aborted: Arc::clone(&self.aborted),
            finished: false,
        };

        let reply = match &self.reply {
            Some(reply) => {
                tokio::time::sleep(self.delay).await;
                reply.clone()
            }
            None => std::future::pending().await,
        };

        guard.finished = true;
        reply
    }
}

// ============================================================================
// Session harness
// ============================================================================

pub struct Harness {
    pub session: SessionOrchestrator,
    pub video: Arc<FakeMedia>,
    pub audio: Arc<FakeMedia>,
    pub device: Arc<DeviceLog>,
    pub relay: Arc<ScriptedRelay>,
}

impl Harness {
    pub fn new(relay: Arc<ScriptedRelay>) -> Self {
        let (device, log) = FakeDevice::granting(&["chunk-1", "chunk-2"]);
        Self::with_device(relay, device, log)
    }

    pub fn with_device(
        relay: Arc<ScriptedRelay>,
        device: Box<FakeDevice>,
        log: Arc<DeviceLog>,
    ) -> Self {
        let video = FakeMedia::new("video");
        let audio = FakeMedia::new("audio");

        let recorder = Recorder::new(device, CaptureConstraints::default());
        let playback = PlaybackController::new(video.clone(), audio.clone(), test_clips());
        let session = SessionOrchestrator::new(
            recorder,
            playback,
            relay.clone(),
            StatusConfig::default(),
        );

        Self {
            session,
            video,
            audio,
            device: log,
            relay,
        }
    }
}

/// Let spawned tasks run without advancing past any pending timer
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
