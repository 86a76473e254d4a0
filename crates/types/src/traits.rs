//! Async traits shared across all chatgate crates.
//!
//! Every cross-crate abstraction is defined here so that higher layers depend
//! only on `chatgate-types`, not on each other. Tests substitute these seams
//! with in-process fakes.

use crate::{GatewayError, TokenGrant, UpstreamCredential};
use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use serde_json::Value;
use std::pin::Pin;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// A pinned, sendable stream of raw response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Exchanges a refresh token at the provider's OAuth token endpoint.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Perform one `refresh_token` grant.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuthUpstream`] if the endpoint rejects the grant
    /// or answers with an unusable body.
    async fn exchange(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// Client for the upstream Messages API.
#[async_trait]
pub trait MessagesApi: Send + Sync {
    /// Send a non-streaming request and return the parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Upstream`] on a non-2xx status, or a transport
    /// or parse error.
    async fn create(&self, credential: &UpstreamCredential, body: &Value) -> Result<Value>;

    /// Send a streaming request and return the response body once the
    /// upstream has answered with a success status.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Upstream`] on a non-2xx status, or a transport error.
    async fn stream(&self, credential: &UpstreamCredential, body: &Value) -> Result<ByteStream>;
}
