//! Shared HTTP plumbing for the upstream clients.
//!
//! Centralises the send → status-check → JSON-or-stream sequence so each
//! client only decides headers and body.

use chatgate_types::{
    GatewayError,
    traits::{ByteStream, Result},
};
use futures_util::StreamExt as _;
use rquest::{Client, RequestBuilder};
use serde_json::Value;

/// Thin wrapper around an [`rquest::Client`].
#[derive(Clone)]
pub struct ProviderHttp {
    http: Client,
}

impl ProviderHttp {
    #[must_use]
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.http
    }

    /// Send a request and require a 2xx status.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Upstream`] carrying the status and body text on
    /// non-success responses, or [`GatewayError::Http`] if the request could
    /// not be sent.
    pub async fn send(&self, builder: RequestBuilder) -> Result<rquest::Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(GatewayError::Upstream {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Send a request and decode a successful body as JSON.
    ///
    /// # Errors
    ///
    /// As [`Self::send`], plus [`GatewayError::InvalidResponse`] if the body is
    /// not JSON.
    pub async fn send_json(&self, builder: RequestBuilder) -> Result<Value> {
        let resp = self.send(builder).await?;
        resp.json::<Value>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    /// Convert a response body into a [`ByteStream`]. Dropping the stream
    /// releases the connection.
    #[must_use]
    pub fn byte_stream(resp: rquest::Response) -> ByteStream {
        Box::pin(resp.bytes_stream().map(|r| r.map_err(GatewayError::from)))
    }
}
