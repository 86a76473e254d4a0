//! Chat handlers: streaming and non-streaming variants.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chatgate_provider::downstream_events;
use chatgate_translate::{ChatReply, PromptMode, RequestDefaults, build_request};
use chatgate_types::{ChatPayload, GatewayError, UpstreamCredential};
use futures_util::StreamExt as _;
use serde_json::Value;
use std::{convert::Infallible, sync::Arc};

use crate::{AppState, credential_header, error::ApiError};

/// Validate the request and resolve its credential, in that order, then
/// build the upstream body. Nothing is sent upstream before the body and the
/// credential header have both been checked.
async fn prepare(
    state: &AppState,
    headers: &HeaderMap,
    payload: &ChatPayload,
    stream: bool,
) -> Result<(UpstreamCredential, Value), ApiError> {
    if payload.is_blank() {
        return Err(GatewayError::InvalidRequest("No message provided".into()).into());
    }
    let raw = credential_header(headers)?;
    let credential = state.resolver.resolve(raw).await?;

    let config = state.config.load();
    let defaults = RequestDefaults {
        model: config.chat.default_model,
        thinking_budget: config.chat.default_thinking_budget,
    };
    let mode = PromptMode::for_credential(&credential);
    let body = build_request(payload, mode, defaults, stream)?;

    tracing::info!(
        model = body["model"].as_str().unwrap_or_default(),
        ?mode,
        stream,
        history = payload.messages.len(),
        "chat request"
    );
    Ok((credential, body))
}

/// Handles `POST /ai/chat/stream`.
///
/// Once the upstream has accepted the request the response is always a 200
/// event stream; later failures arrive as an `error` event.
///
/// # Errors
///
/// Returns [`ApiError`] for validation, credential, or upstream failures that
/// happen before the stream opens.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let (credential, body) = prepare(&state, &headers, &payload, true).await?;
    let upstream = state.messages.stream(&credential, &body).await?;

    let heartbeat = state.config.load().heartbeat_interval();
    let frames = downstream_events(upstream, heartbeat)
        .map(|event| Ok::<_, Infallible>(Bytes::from(event.to_sse_frame())));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(frames),
    )
        .into_response())
}

/// Handles `POST /ai/chat`.
///
/// # Errors
///
/// Returns [`ApiError`] for validation, credential, or upstream failures, and
/// a 500 if the upstream answer has no content blocks.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(payload) = payload?;
    let (credential, body) = prepare(&state, &headers, &payload, false).await?;
    let message = state.messages.create(&credential, &body).await?;
    let reply = ChatReply::from_message(&message)?;
    tracing::debug!(applied = reply.applied_code.is_some(), "chat reply");
    Ok(Json(reply))
}
