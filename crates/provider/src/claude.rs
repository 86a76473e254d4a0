//! Anthropic Messages API client.
//!
//! Auth: `Authorization: Bearer` plus the OAuth beta flag for session
//! credentials, `x-api-key` for API keys.

use crate::http_util::ProviderHttp;
use async_trait::async_trait;
use chatgate_types::{
    GatewayError, UpstreamCredential,
    traits::{ByteStream, MessagesApi, Result},
};
use rquest::{Client, RequestBuilder};
use serde_json::Value;

/// Beta flag required for OAuth Bearer tokens.
pub const OAUTH_BETA: &str = "oauth-2025-04-20";

/// Credential-dependent headers for a Messages API request.
#[must_use]
pub fn auth_headers(credential: &UpstreamCredential) -> Vec<(&'static str, String)> {
    match credential {
        UpstreamCredential::Session(_) => vec![
            ("authorization", format!("Bearer {}", credential.expose())),
            ("anthropic-beta", OAUTH_BETA.to_string()),
        ],
        UpstreamCredential::ApiKey(_) => vec![("x-api-key", credential.expose().to_string())],
    }
}

/// [`MessagesApi`] over HTTP.
pub struct ClaudeClient {
    ph: ProviderHttp,
    messages_url: String,
    anthropic_version: String,
}

impl ClaudeClient {
    pub fn new(
        http: Client,
        messages_url: impl Into<String>,
        anthropic_version: impl Into<String>,
    ) -> Self {
        Self {
            ph: ProviderHttp::new(http),
            messages_url: messages_url.into(),
            anthropic_version: anthropic_version.into(),
        }
    }

    fn request(&self, credential: &UpstreamCredential, body: &Value) -> RequestBuilder {
        let builder = self
            .ph
            .client()
            .post(&self.messages_url)
            .header("anthropic-version", self.anthropic_version.as_str())
            .header("content-type", "application/json");
        auth_headers(credential)
            .into_iter()
            .fold(builder, |b, (name, value)| b.header(name, value))
            .json(body)
    }
}

fn log_rejection(err: GatewayError) -> GatewayError {
    if let GatewayError::Upstream { status, body } = &err {
        tracing::warn!(status, body = %body, "messages request rejected");
    }
    err
}

#[async_trait]
impl MessagesApi for ClaudeClient {
    async fn create(&self, credential: &UpstreamCredential, body: &Value) -> Result<Value> {
        self.ph
            .send_json(self.request(credential, body))
            .await
            .map_err(log_rejection)
    }

    async fn stream(&self, credential: &UpstreamCredential, body: &Value) -> Result<ByteStream> {
        let resp = self
            .ph
            .send(self.request(credential, body))
            .await
            .map_err(log_rejection)?;
        tracing::debug!(status = resp.status().as_u16(), "messages stream opened");
        Ok(ProviderHttp::byte_stream(resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use futures_util::StreamExt as _;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<HeaderMap>>>;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1/messages")
    }

    fn recording_router(seen: Seen) -> Router {
        Router::new().route(
            "/v1/messages",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(headers);
                    Json(json!({
                        "id": "msg_1",
                        "model": body["model"],
                        "content": [{"type": "text", "text": "hi"}]
                    }))
                }
            }),
        )
    }

    #[test]
    fn test_session_headers() {
        let h = auth_headers(&UpstreamCredential::session("sk-ant-oat01-abc"));
        assert_eq!(h, vec![
            ("authorization", "Bearer sk-ant-oat01-abc".to_string()),
            ("anthropic-beta", "oauth-2025-04-20".to_string()),
        ]);
    }

    #[test]
    fn test_api_key_headers() {
        let h = auth_headers(&UpstreamCredential::api_key("sk-ant-api03-abc"));
        assert_eq!(h, vec![("x-api-key", "sk-ant-api03-abc".to_string())]);
    }

    #[tokio::test]
    async fn test_create_sends_session_headers() {
        let seen = Seen::default();
        let url = spawn(recording_router(seen.clone())).await;
        let client = ClaudeClient::new(Client::new(), url, "2023-06-01");

        let resp = client
            .create(
                &UpstreamCredential::session("sk-ant-oat01-abc"),
                &json!({"model": "claude-sonnet-4-5"}),
            )
            .await
            .unwrap();
        assert_eq!(resp["model"], "claude-sonnet-4-5");

        let headers = seen.lock().unwrap()[0].clone();
        assert_eq!(headers["anthropic-version"], "2023-06-01");
        assert_eq!(headers["authorization"], "Bearer sk-ant-oat01-abc");
        assert_eq!(headers["anthropic-beta"], "oauth-2025-04-20");
        assert!(headers.get("x-api-key").is_none());
    }

    #[tokio::test]
    async fn test_create_sends_api_key() {
        let seen = Seen::default();
        let url = spawn(recording_router(seen.clone())).await;
        let client = ClaudeClient::new(Client::new(), url, "2023-06-01");

        client
            .create(&UpstreamCredential::api_key("sk-ant-api03-k"), &json!({}))
            .await
            .unwrap();

        let headers = seen.lock().unwrap()[0].clone();
        assert_eq!(headers["x-api-key"], "sk-ant-api03-k");
        assert!(headers.get("authorization").is_none());
        assert!(headers.get("anthropic-beta").is_none());
    }

    #[tokio::test]
    async fn test_rejection_carries_status() {
        let router = Router::new().route(
            "/v1/messages",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": {"message": "invalid x-api-key"}})),
                )
            }),
        );
        let url = spawn(router).await;
        let client = ClaudeClient::new(Client::new(), url, "2023-06-01");

        let err = client
            .stream(&UpstreamCredential::api_key("sk-ant-api03-bad"), &json!({}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::Upstream { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_stream_yields_body_bytes() {
        let router = Router::new().route(
            "/v1/messages",
            post(|| async {
                (
                    [("content-type", "text/event-stream")],
                    "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
                )
            }),
        );
        let url = spawn(router).await;
        let client = ClaudeClient::new(Client::new(), url, "2023-06-01");

        let mut stream = client
            .stream(&UpstreamCredential::session("sk-ant-oat01-x"), &json!({}))
            .await
            .unwrap();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert!(String::from_utf8(body).unwrap().contains("message_stop"));
    }
}
