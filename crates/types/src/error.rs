//! Unified error type for the chatgate workspace.

use thiserror::Error;

/// Enumerates all error kinds that can occur across chatgate crates.
///
/// Conditions that are recovered inside a running stream (a corrupt event
/// line, an unparsable tool payload) are not represented here; they never
/// leave the translator.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request carried no upstream credential header.
    #[error("no credential provided")]
    MissingCredential,

    /// The credential does not carry any known prefix.
    #[error("unrecognized credential format")]
    UnrecognizedCredential,

    /// The provider's token endpoint rejected a refresh exchange.
    #[error("credential exchange failed: {0}")]
    AuthUpstream(String),

    /// The inbound request failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream provider returned a non-success status.
    #[error("upstream error: status={status}, body={body}")]
    Upstream { status: u16, body: String },

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(String),

    /// The upstream answered 2xx but the body was unusable.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// An optional feature has not been configured on this deployment.
    #[error("{0} not configured")]
    NotConfigured(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),
}

// ── Feature-gated From impls ──────────────────────────────────────────────────

#[cfg(feature = "rquest")]
impl From<rquest::Error> for GatewayError {
    fn from(e: rquest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GatewayError>;
