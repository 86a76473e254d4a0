//! Claude OAuth refresh-token exchange.
//!
//! The token endpoint rotates the refresh token on every successful grant;
//! the previous value is invalid from that moment on.

use async_trait::async_trait;
use chatgate_types::{GatewayError, TokenExchanger, TokenGrant, traits::Result};

/// Build the JSON body for a `refresh_token` grant.
#[must_use]
pub fn build_refresh_request(client_id: &str, refresh_token: &str) -> serde_json::Value {
    serde_json::json!({
        "grant_type": "refresh_token",
        "client_id": client_id,
        "refresh_token": refresh_token,
    })
}

/// Parse the token endpoint JSON response into a [`TokenGrant`].
///
/// # Errors
///
/// Returns an error if the response is missing the `access_token` field.
pub fn parse_token_response(json: &serde_json::Value) -> Result<TokenGrant> {
    let access_token = json
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| GatewayError::AuthUpstream("missing access_token in response".into()))?
        .to_string();

    Ok(TokenGrant {
        access_token,
        refresh_token: json
            .get("refresh_token")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        expires_in: json.get("expires_in").and_then(serde_json::Value::as_u64),
    })
}

/// [`TokenExchanger`] backed by the provider's HTTP token endpoint.
pub struct HttpTokenExchanger {
    http: rquest::Client,
    token_url: String,
    client_id: String,
}

impl HttpTokenExchanger {
    pub fn new(
        http: rquest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, refresh_token: &str) -> Result<TokenGrant> {
        let body = build_refresh_request(&self.client_id, refresh_token);
        let resp = self
            .http
            .post(&self.token_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::AuthUpstream(format!("token endpoint unreachable: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %text, "token refresh failed");
            return Err(GatewayError::AuthUpstream(format!(
                "token endpoint returned {status}"
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::AuthUpstream(format!("failed to parse token response: {e}")))?;
        parse_token_response(&json)
    }
}
