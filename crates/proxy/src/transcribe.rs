//! `POST /ai/transcribe`: speech-to-text passthrough.

use axum::{
    Json,
    extract::{FromRequest as _, Multipart, Request, State},
};
use chatgate_provider::TranscriptionClient;
use chatgate_types::GatewayError;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::{AppState, error::ApiError};

/// Multipart field carrying the recording.
const AUDIO_FIELD: &str = "audio";

/// Handles `POST /ai/transcribe`.
///
/// # Errors
///
/// 503 when no transcription key is configured, 400 without an `audio`
/// field, 500 when the provider fails.
pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let config = state.config.load_full();
    let Some(api_key) = config.transcription.api_key.as_deref() else {
        return Err(GatewayError::NotConfigured("Transcription service".into()).into());
    };

    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidRequest(e.body_text()))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
        audio = Some((data, content_type));
        break;
    }
    let Some((data, content_type)) = audio else {
        return Err(GatewayError::InvalidRequest("No audio file provided".into()).into());
    };

    tracing::info!(bytes = data.len(), "transcription request");
    let client = TranscriptionClient::new(
        state.http.clone(),
        config.transcription.url.as_str(),
        config.transcription.model.as_str(),
        api_key,
    );
    // The provider's status and body are logged by the client; the caller
    // only learns that transcription failed.
    let text = client
        .transcribe(data, content_type.as_deref())
        .await
        .map_err(|e| match e {
            GatewayError::InvalidRequest(_) => e,
            _ => GatewayError::InvalidResponse("Transcription failed".into()),
        })?;

    Ok(Json(json!({ "text": text })))
}
