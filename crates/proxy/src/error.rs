//! API error type that maps [`GatewayError`] variants to HTTP status codes.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chatgate_types::GatewayError;
use serde_json::json;

/// Wrapper around [`GatewayError`] that implements [`IntoResponse`].
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl ApiError {
    /// Returns `(status, error_type, error_code)` for the wrapped error.
    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match &self.0 {
            GatewayError::MissingCredential => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "missing_credential",
            ),
            GatewayError::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request",
            ),
            GatewayError::UnrecognizedCredential => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "unrecognized_credential",
            ),
            GatewayError::AuthUpstream(_) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "credential_exchange_failed",
            ),
            GatewayError::Upstream { status: 401, .. } => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "invalid_api_key",
            ),
            GatewayError::NotConfigured(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "not_configured",
            ),
            GatewayError::Upstream { .. } | GatewayError::Http(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "upstream_error",
            ),
            GatewayError::InvalidResponse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "invalid_response",
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal_error",
            ),
        }
    }

    /// Client-facing message. Upstream bodies stay in the server log.
    fn message(&self) -> String {
        match &self.0 {
            GatewayError::Upstream { status, .. } => format!("upstream returned {status}"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, error_code) = self.classify();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (
            status,
            Json(json!({
                "error": {
                    "message": self.message(),
                    "type": error_type,
                    "code": error_code,
                }
            })),
        )
            .into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self(e)
    }
}

/// Unreadable or mistyped request bodies get the same envelope as other 400s.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(GatewayError::InvalidRequest(rejection.body_text()))
    }
}
