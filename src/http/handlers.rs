use super::state::AppState;
use crate::capture::{Utterance, DEFAULT_FILE_NAME};
use crate::relay::RelayResponse;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, info};

// ============================================================================
// Handlers
// ============================================================================

/// POST /relay
/// Forward the `audio` field to the processing endpoint
///
/// Webhook-level failures are reported as `success: false` with 200. Only
/// requests the relay cannot read at all get a non-2xx status.
pub async fn relay_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let utterance = match read_audio(&state, multipart).await {
        Ok(utterance) => utterance,
        Err((status, message)) => {
            error!("Relay request rejected: {}", message);
            return (status, Json(RelayResponse::fault(message))).into_response();
        }
    };

    let result = state.relay.send(utterance).await;

    (StatusCode::OK, Json(RelayResponse::from(&result))).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn read_audio(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Utterance, (StatusCode, String)> {
    let mut multipart = multipart.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("invalid multipart request: {}", e),
        )
    })?;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| (fault_status(e.status()), format!("multipart error: {}", e)))?;

        let Some(field) = field else {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "No audio file received".to_string(),
            ));
        };

        if field.name() != Some(state.audio_field.as_str()) {
            continue;
        }

        let file_name = field.file_name().unwrap_or(DEFAULT_FILE_NAME).to_string();
        let content_type = field.content_type().unwrap_or("audio/webm").to_string();
        let data = field.bytes().await.map_err(|e| {
            (
                fault_status(e.status()),
                format!("failed to read audio: {}", e),
            )
        })?;

        info!(
            "Relay received audio file: name={}, size={}, type={}",
            file_name,
            data.len(),
            content_type
        );

        return Ok(Utterance::new(data, content_type).with_file_name(file_name));
    }
}

/// Oversized uploads keep their 413; everything else is the catch-all 500
fn fault_status(status: StatusCode) -> StatusCode {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        status
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
