//! HTTP relay endpoint
//!
//! This module provides the REST surface the browser front end posts to:
//! - POST /relay - Forward an `audio` multipart upload to the webhook
//! - POST /api/webhook - Alias of /relay
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
