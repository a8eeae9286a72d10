use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::result::{FailureKind, RelayFailure, RelayResult};

/// JSON body returned by the relay endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failure classification, so clients need not parse `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,

    /// Raw webhook reply, when there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RelayResponse {
    /// Catch-all failure body for requests the relay could not handle at all
    pub fn fault(error: impl Into<String>) -> Self {
        Self {
            success: false,
            audio_url: None,
            error: Some(error.into()),
            error_kind: None,
            data: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Rebuild the typed result on the client side
    pub fn into_result(self) -> RelayResult {
        if self.success {
            return RelayResult::audio(self.audio_url.unwrap_or_default(), self.data);
        }

        let failure = RelayFailure::new(
            self.error_kind.unwrap_or(FailureKind::Remote),
            self.error
                .unwrap_or_else(|| "relay reported a failure".to_string()),
        );
        RelayResult::failure(failure, self.data)
    }
}

impl From<&RelayResult> for RelayResponse {
    fn from(result: &RelayResult) -> Self {
        Self {
            success: result.is_success(),
            audio_url: result.audio_url().map(str::to_owned),
            error: result.error().map(str::to_owned),
            error_kind: result.failure_reason().map(RelayFailure::kind),
            data: result.raw().cloned(),
            timestamp: Some(Utc::now()),
        }
    }
}
