//! `POST /ai/test-token`: checks that a credential is accepted upstream.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chatgate_translate::probe_request;
use chatgate_types::GatewayError;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::{AppState, credential_header};

#[derive(Debug, Serialize)]
pub struct TokenCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenCheck {
    fn invalid(status: StatusCode, error: impl Into<String>) -> Response {
        let body = Self {
            valid: false,
            error: Some(error.into()),
        };
        (status, Json(body)).into_response()
    }
}

/// Pull `error.message` out of an upstream error body.
fn upstream_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .pointer("/error/message")?
        .as_str()
        .map(str::to_owned)
}

/// Handles `POST /ai/test-token`.
///
/// Resolves the credential and sends a one-token probe. Answers `{valid}` on
/// success and `{valid: false, error}` otherwise: 400 without a credential,
/// 401 when the upstream rejects it, 500 when it could not be checked.
pub async fn test_token(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Ok(raw) = credential_header(&headers) else {
        return TokenCheck::invalid(StatusCode::BAD_REQUEST, "No token provided");
    };

    let credential = match state.resolver.resolve(raw).await {
        Ok(c) => c,
        Err(e) => return TokenCheck::invalid(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let probe = probe_request(state.config.load().chat.default_model);
    match state.messages.create(&credential, &probe).await {
        Ok(_) => Json(TokenCheck {
            valid: true,
            error: None,
        })
        .into_response(),
        Err(GatewayError::Upstream { status, body }) => {
            tracing::info!(status, "credential rejected by upstream");
            let message = upstream_message(&body).unwrap_or_else(|| "Invalid token".into());
            TokenCheck::invalid(StatusCode::UNAUTHORIZED, message)
        }
        Err(e) => {
            tracing::warn!(error = %e, "credential probe failed");
            TokenCheck::invalid(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message() {
        assert_eq!(
            upstream_message(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
                .as_deref(),
            Some("invalid x-api-key")
        );
        assert_eq!(upstream_message("<html>502</html>"), None);
        assert_eq!(upstream_message(r#"{"error":"nope"}"#), None);
    }
}
