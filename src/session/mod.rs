//! Conversation session orchestration
//!
//! This module provides the `SessionOrchestrator` that sequences one turn:
//! - Microphone capture via the `Recorder`
//! - Relay call with a processing timer
//! - Avatar playback transitions (thinking, talking, idle)
//! - Status messages with automatic dismissal

mod messages;
mod orchestrator;
mod status;

pub use messages::relay_failure_message;
pub use orchestrator::{GestureOutcome, SessionOrchestrator, SessionPhase};
pub use status::{format_elapsed, SessionStatus};
