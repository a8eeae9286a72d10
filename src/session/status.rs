use serde::Serialize;

/// UI projection of the conversation session
///
/// Fields only change through the named transition methods below; the
/// orchestrator publishes a fresh snapshot after every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Microphone capture is running
    is_recording: bool,

    /// An utterance is being processed or its response is playing
    is_processing: bool,

    /// Message line shown under the avatar
    status_message: Option<String>,

    /// Seconds spent waiting for the current reply (display only)
    elapsed_processing_seconds: u64,
}

impl SessionStatus {
    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn elapsed_processing_seconds(&self) -> u64 {
        self.elapsed_processing_seconds
    }

    /// Whether the record/stop control accepts gestures
    pub fn trigger_enabled(&self) -> bool {
        !self.is_processing
    }

    pub(crate) fn recording_started(&mut self, message: &str) {
        self.is_recording = true;
        self.is_processing = false;
        self.status_message = Some(message.to_string());
    }

    pub(crate) fn recording_failed(&mut self, message: String) {
        self.is_recording = false;
        self.status_message = Some(message);
    }

    pub(crate) fn processing_started(&mut self, message: &str) {
        self.is_recording = false;
        self.is_processing = true;
        self.elapsed_processing_seconds = 0;
        self.status_message = Some(message.to_string());
    }

    pub(crate) fn tick(&mut self, elapsed_secs: u64) {
        self.elapsed_processing_seconds = elapsed_secs;
    }

    /// Response arrived; processing continues until playback completes
    pub(crate) fn response_ready(&mut self, message: &str) {
        self.status_message = Some(message.to_string());
    }

    pub(crate) fn processing_failed(&mut self, message: String) {
        self.is_processing = false;
        self.status_message = Some(message);
    }

    pub(crate) fn playback_finished(&mut self) {
        self.is_processing = false;
    }

    pub(crate) fn dismiss_message(&mut self) {
        self.status_message = None;
        self.elapsed_processing_seconds = 0;
    }

    pub(crate) fn cancelled(&mut self) {
        self.is_recording = false;
        self.is_processing = false;
        self.elapsed_processing_seconds = 0;
    }
}

/// Timer display, `m:ss`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
