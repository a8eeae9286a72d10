use crate::config::StatusMessages;
use crate::relay::{prefix, FailureKind, RelayFailure};

/// Longest failure detail appended to the generic error message
const DETAIL_CHARS: usize = 50;

/// Short user-facing text for a failed relay call
pub fn relay_failure_message(messages: &StatusMessages, failure: &RelayFailure) -> String {
    match failure.kind() {
        FailureKind::Timeout => messages.timed_out.clone(),
        FailureKind::Transport => messages.unreachable.clone(),
        FailureKind::Malformed | FailureKind::NoAudio => messages.unexpected_format.clone(),
        FailureKind::Upstream | FailureKind::Remote => format!(
            "{}: {}",
            messages.generic_error,
            prefix(failure.message(), DETAIL_CHARS)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_each_kind_maps_to_its_message() {
        let messages = StatusMessages::default();

        assert_eq!(
            relay_failure_message(&messages, &RelayFailure::timeout(Duration::from_secs(300))),
            messages.timed_out
        );
        assert_eq!(
            relay_failure_message(&messages, &RelayFailure::transport("connection refused")),
            messages.unreachable
        );
        assert_eq!(
            relay_failure_message(&messages, &RelayFailure::malformed()),
            messages.unexpected_format
        );
        assert_eq!(
            relay_failure_message(&messages, &RelayFailure::no_audio()),
            messages.unexpected_format
        );
        assert_eq!(
            relay_failure_message(&messages, &RelayFailure::upstream(500, "internal error")),
            "Something went wrong: 500 internal error"
        );
    }

    #[test]
    fn test_detail_is_truncated() {
        let messages = StatusMessages::default();
        let failure = RelayFailure::new(FailureKind::Remote, "e".repeat(200));
        let text = relay_failure_message(&messages, &failure);
        assert_eq!(text.len(), "Something went wrong: ".len() + DETAIL_CHARS);
    }
}
