use anyhow::{Context, Result};
use reqwest::multipart::Form;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::classify::{prefix, ERROR_BODY_PREFIX_CHARS};
use super::result::{RelayFailure, RelayResult};
use super::upstream::audio_part;
use super::wire::RelayResponse;
use super::Relay;
use crate::capture::Utterance;
use crate::config::ClientConfig;

/// Client-side half of the relay: posts utterances to the local relay
/// endpoint and decodes its normalized reply
pub struct RelayClient {
    client: reqwest::Client,
    relay_url: String,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            relay_url: config.relay_url.clone(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait::async_trait]
impl Relay for RelayClient {
    async fn send(&self, utterance: Utterance) -> RelayResult {
        let relay_id = Uuid::new_v4();
        info!(%relay_id, bytes = utterance.len(), "Sending utterance to relay {}", self.relay_url);

        let file_name = utterance.file_name().to_string();
        let form = Form::new().part("audio", audio_part(utterance, &file_name));

        let response = match self.client.post(&self.relay_url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => return transport_failure(relay_id, e, self.timeout),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return transport_failure(relay_id, e, self.timeout),
        };

        info!(%relay_id, status, "Relay responded");
        decode(status, &body)
    }
}

fn transport_failure(relay_id: Uuid, err: reqwest::Error, timeout: Duration) -> RelayResult {
    error!(%relay_id, "Relay call failed: {}", err);
    let failure = if err.is_timeout() {
        RelayFailure::timeout(timeout)
    } else {
        RelayFailure::transport(err)
    };
    RelayResult::failure(failure, None)
}

/// Decode a relay reply; the catch-all 500 still carries a JSON envelope
///
/// A non-2xx reply is a failure whatever its envelope claims. Its own
/// error text and kind are kept when it reports one.
pub fn decode(status: u16, body: &str) -> RelayResult {
    let ok_status = (200..300).contains(&status);
    match serde_json::from_str::<RelayResponse>(body) {
        Ok(envelope) if ok_status => envelope.into_result(),
        Ok(envelope) if !envelope.success && envelope.error.is_some() => envelope.into_result(),
        Ok(envelope) => {
            warn!("Relay answered {} with success={}", status, envelope.success);
            RelayResult::failure(
                RelayFailure::upstream(status, prefix(body, ERROR_BODY_PREFIX_CHARS)),
                envelope.data,
            )
        }
        Err(e) => {
            warn!("Relay returned invalid response ({}): {}", e, prefix(body, 100));
            if ok_status {
                RelayResult::failure(RelayFailure::malformed(), None)
            } else {
                RelayResult::failure(
                    RelayFailure::upstream(status, prefix(body, ERROR_BODY_PREFIX_CHARS)),
                    None,
                )
            }
        }
    }
}
