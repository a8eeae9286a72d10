use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::classify::{classify, prefix};
use super::result::{RelayFailure, RelayResult};
use super::Relay;
use crate::capture::Utterance;
use crate::config::RelayConfig;

/// Server-side half of the relay: posts utterances to the remote webhook
pub struct UpstreamForwarder {
    client: reqwest::Client,
    config: RelayConfig,
}

impl UpstreamForwarder {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    async fn forward(&self, relay_id: Uuid, utterance: Utterance) -> RelayResult {
        let form = Form::new().part(
            self.config.audio_field.clone(),
            audio_part(utterance, &self.config.file_name),
        );

        let timeout = self.config.timeout();
        let exchange = async {
            let response = self
                .client
                .post(&self.config.webhook_url)
                .multipart(form)
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) if e.is_timeout() => {
                error!(%relay_id, "Webhook call timed out: {}", e);
                return RelayResult::failure(RelayFailure::timeout(timeout), None);
            }
            Ok(Err(e)) => {
                error!(%relay_id, "Webhook call failed: {}", e);
                return RelayResult::failure(RelayFailure::transport(e), None);
            }
            Err(_) => {
                error!(%relay_id, "Webhook call exceeded {} seconds", timeout.as_secs());
                return RelayResult::failure(RelayFailure::timeout(timeout), None);
            }
        };

        info!(%relay_id, status, "Webhook responded");
        debug!(%relay_id, "Webhook raw response: {}", prefix(&body, 500));

        let result = classify(status, &body);
        match result.error() {
            None => info!(%relay_id, "Received audio URL from webhook"),
            Some(err) => warn!(%relay_id, "Webhook reply unusable: {}", err),
        }
        result
    }
}

#[async_trait::async_trait]
impl Relay for UpstreamForwarder {
    async fn send(&self, utterance: Utterance) -> RelayResult {
        let relay_id = Uuid::new_v4();
        info!(
            %relay_id,
            bytes = utterance.len(),
            "Forwarding utterance to webhook (may take up to {} seconds)",
            self.config.timeout_secs
        );
        self.forward(relay_id, utterance).await
    }
}

/// Multipart part for an utterance, falling back to no content type if the
/// recorded MIME string does not parse
pub(crate) fn audio_part(utterance: Utterance, file_name: &str) -> Part {
    let mime_type = utterance.mime_type().to_string();
    let data = utterance.into_bytes();

    match Part::bytes(data.to_vec())
        .file_name(file_name.to_string())
        .mime_str(&mime_type)
    {
        Ok(part) => part,
        Err(e) => {
            warn!("Ignoring invalid audio MIME type {:?}: {}", mime_type, e);
            Part::bytes(data.to_vec()).file_name(file_name.to_string())
        }
    }
}
