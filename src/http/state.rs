use anyhow::Result;
use std::sync::Arc;

use crate::config::{HttpConfig, RelayConfig};
use crate::relay::{Relay, UpstreamForwarder};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Forwards received utterances to the processing endpoint
    pub relay: Arc<dyn Relay>,

    /// Multipart field expected to carry the audio
    pub audio_field: String,

    /// Largest accepted request body, in bytes
    pub max_audio_bytes: usize,
}

impl AppState {
    pub fn new(relay: Arc<dyn Relay>) -> Self {
        let http = HttpConfig::default();
        Self {
            relay,
            audio_field: "audio".to_string(),
            max_audio_bytes: http.max_audio_bytes,
        }
    }

    /// State backed by the real webhook forwarder
    pub fn from_config(relay: &RelayConfig, http: &HttpConfig) -> Result<Self> {
        let forwarder = UpstreamForwarder::new(relay.clone())?;
        Ok(Self {
            relay: Arc::new(forwarder),
            audio_field: relay.audio_field.clone(),
            max_audio_bytes: http.max_audio_bytes,
        })
    }
}
