use serde_json::{json, Value};
use tracing::warn;

use super::result::{is_usable_audio_url, RelayFailure, RelayResult};

/// How much of an error body is kept in `"<status> <body-prefix>"`
pub const ERROR_BODY_PREFIX_CHARS: usize = 200;

/// Classify a webhook reply
///
/// Rules apply in priority order:
/// 1. non-2xx status is a failure, whatever the body says
/// 2. JSON with a usable `audioUrl` is a success
/// 3. JSON without one is a `no audio` failure
/// 4. a non-JSON body that is itself a URL is a success
/// 5. anything else is malformed
pub fn classify(status: u16, body: &str) -> RelayResult {
    if !(200..300).contains(&status) {
        return RelayResult::failure(
            RelayFailure::upstream(status, prefix(body, ERROR_BODY_PREFIX_CHARS)),
            None,
        );
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let audio_url = value
                .get("audioUrl")
                .and_then(Value::as_str)
                .filter(|url| is_usable_audio_url(url))
                .map(str::to_owned);

            match audio_url {
                Some(url) => RelayResult::audio(url, Some(value)),
                None => {
                    warn!("No usable audioUrl in webhook response: {}", value);
                    RelayResult::failure(RelayFailure::no_audio(), Some(value))
                }
            }
        }
        Err(_) => {
            if is_usable_audio_url(body) {
                let url = body.trim();
                RelayResult::audio(url, Some(json!({ "audioUrl": url })))
            } else {
                warn!(
                    "Webhook returned non-JSON response: {}",
                    prefix(body, 100)
                );
                RelayResult::failure(RelayFailure::malformed(), None)
            }
        }
    }
}

/// The first `max_chars` characters of `text`
pub fn prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
