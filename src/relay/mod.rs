//! Relay forwarding
//!
//! Moves one utterance to the remote processing endpoint and normalizes the
//! reply into a `RelayResult`. Both halves implement `Relay`:
//! - `UpstreamForwarder` - server side, calls the remote webhook
//! - `RelayClient` - client side, calls the local relay endpoint

mod classify;
mod client;
mod result;
mod upstream;
mod wire;

pub use classify::{classify, prefix, ERROR_BODY_PREFIX_CHARS};
pub use client::{decode, RelayClient};
pub use result::{is_usable_audio_url, FailureKind, RelayFailure, RelayResult};
pub use upstream::UpstreamForwarder;
pub use wire::RelayResponse;

use crate::capture::Utterance;

/// Sends an utterance for processing
///
/// Never fails: every transport or format problem is folded into the
/// returned `RelayResult`.
#[async_trait::async_trait]
pub trait Relay: Send + Sync {
    async fn send(&self, utterance: Utterance) -> RelayResult;
}
