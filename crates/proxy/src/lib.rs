//! HTTP layer: axum router, route handlers, and error mapping.
//!
//! All routes live under `/ai`:
//! - `POST /ai/chat/stream`  chat as a server-sent event stream
//! - `POST /ai/chat`         chat, single JSON reply
//! - `POST /ai/test-token`   credential check
//! - `POST /ai/transcribe`   audio transcription passthrough

mod chat;
mod error;
mod token;
mod transcribe;

pub use error::ApiError;
pub use token::TokenCheck;

use arc_swap::ArcSwap;
use axum::{Router, http::HeaderMap, routing::post};
use chatgate_auth::{CredentialResolver, HttpTokenExchanger};
use chatgate_config::Config;
use chatgate_provider::ClaudeClient;
use chatgate_types::{GatewayError, MessagesApi};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Request header carrying the caller's upstream credential.
pub const CREDENTIAL_HEADER: &str = "x-claude-token";

/// Shared application state passed to all route handlers.
pub struct AppState {
    /// Server configuration, atomically swappable for hot-reloading.
    pub config: Arc<ArcSwap<Config>>,
    /// Credential resolution with the process-wide refresh cache.
    pub resolver: Arc<CredentialResolver>,
    /// Messages API client.
    pub messages: Arc<dyn MessagesApi>,
    /// HTTP client for the remaining upstream calls.
    pub http: rquest::Client,
}

impl AppState {
    /// Creates the production state from the current configuration.
    ///
    /// Upstream URLs are read once here; a config reload changes the chat
    /// defaults and transcription settings but not these endpoints.
    pub fn new(config: Arc<ArcSwap<Config>>) -> Arc<Self> {
        let snapshot = config.load_full();
        let http = build_http_client(snapshot.proxy_url.as_deref());
        let exchanger = HttpTokenExchanger::new(
            http.clone(),
            snapshot.upstream.token_url.as_str(),
            snapshot.upstream.client_id.as_str(),
        );
        let messages = ClaudeClient::new(
            http.clone(),
            snapshot.upstream.messages_url.as_str(),
            snapshot.upstream.anthropic_version.as_str(),
        );
        Self::from_parts(
            config,
            Arc::new(CredentialResolver::new(Arc::new(exchanger))),
            Arc::new(messages),
            http,
        )
    }

    /// Assembles state from explicit collaborators.
    pub fn from_parts(
        config: Arc<ArcSwap<Config>>,
        resolver: Arc<CredentialResolver>,
        messages: Arc<dyn MessagesApi>,
        http: rquest::Client,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            resolver,
            messages,
            http,
        })
    }
}

/// Build an HTTP client, optionally configured with a proxy URL.
fn build_http_client(proxy_url: Option<&str>) -> rquest::Client {
    if let Some(url) = proxy_url {
        match rquest::Proxy::all(url) {
            Ok(proxy) => {
                return rquest::Client::builder()
                    .proxy(proxy)
                    .build()
                    .unwrap_or_else(|_| rquest::Client::new());
            }
            Err(e) => {
                tracing::warn!(url = url, error = %e, "invalid proxy_url, using direct connection");
            }
        }
    }
    rquest::Client::new()
}

/// Read the raw credential from [`CREDENTIAL_HEADER`].
pub(crate) fn credential_header(headers: &HeaderMap) -> Result<&str, GatewayError> {
    headers
        .get(CREDENTIAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingCredential)
}

/// Build the full axum router.
pub fn make_router(state: Arc<AppState>) -> Router {
    let ai = Router::new()
        .route("/chat/stream", post(chat::chat_stream))
        .route("/chat", post(chat::chat))
        .route("/test-token", post(token::test_token))
        .route("/transcribe", post(transcribe::transcribe));

    Router::new()
        .nest("/ai", ai)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
