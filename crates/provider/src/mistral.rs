//! Audio transcription via the Mistral Voxtral API.

use crate::http_util::ProviderHttp;
use bytes::Bytes;
use chatgate_types::{GatewayError, traits::Result};
use rquest::{
    Client,
    multipart::{Form, Part},
};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;

/// File name the audio is uploaded under.
pub const UPLOAD_FILE_NAME: &str = "audio.webm";

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct TranscriptionClient {
    ph: ProviderHttp,
    url: String,
    model: String,
    api_key: SecretString,
}

impl TranscriptionClient {
    pub fn new(
        http: Client,
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            ph: ProviderHttp::new(http),
            url: url.into(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
        }
    }

    /// Upload `audio` and return the transcript text.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Upstream`] if the provider rejects the upload and
    /// [`GatewayError::InvalidResponse`] if the answer carries no text.
    pub async fn transcribe(&self, audio: Bytes, content_type: Option<&str>) -> Result<String> {
        let mut part = Part::bytes(audio.to_vec()).file_name(UPLOAD_FILE_NAME);
        if let Some(mime) = content_type {
            part = part
                .mime_str(mime)
                .map_err(|e| GatewayError::InvalidRequest(format!("bad audio type: {e}")))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let builder = self
            .ph
            .client()
            .post(&self.url)
            .header(
                "authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .multipart(form);

        let json = self.ph.send_json(builder).await.inspect_err(|e| {
            tracing::error!(error = %e, "transcription request failed");
        })?;
        let parsed: TranscriptionResponse = serde_json::from_value(json)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        tracing::debug!(chars = parsed.text.len(), "transcription complete");
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Multipart,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use serde_json::json;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1/audio/transcriptions")
    }

    #[tokio::test]
    async fn test_transcribe_forwards_file_and_model() {
        let router = Router::new().route(
            "/v1/audio/transcriptions",
            post(|headers: HeaderMap, mut form: Multipart| async move {
                assert_eq!(headers["authorization"], "Bearer mistral-key");
                let mut file_name = None;
                let mut model = None;
                let mut audio = Vec::new();
                while let Some(field) = form.next_field().await.unwrap() {
                    let name = field.name().map(str::to_owned);
                    match name.as_deref() {
                        Some("file") => {
                            file_name = field.file_name().map(str::to_owned);
                            audio = field.bytes().await.unwrap().to_vec();
                        }
                        Some("model") => model = Some(field.text().await.unwrap()),
                        _ => {}
                    }
                }
                Json(json!({
                    "text": format!(
                        "{}|{}|{}",
                        file_name.unwrap_or_default(),
                        model.unwrap_or_default(),
                        String::from_utf8_lossy(&audio)
                    )
                }))
            }),
        );
        let url = spawn(router).await;
        let client =
            TranscriptionClient::new(Client::new(), url, "voxtral-mini-2507", "mistral-key");

        let text = client
            .transcribe(Bytes::from_static(b"RIFF"), Some("audio/webm"))
            .await
            .unwrap();
        assert_eq!(text, "audio.webm|voxtral-mini-2507|RIFF");
    }

    #[tokio::test]
    async fn test_transcribe_upstream_failure() {
        let router = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "bad audio") }),
        );
        let url = spawn(router).await;
        let client = TranscriptionClient::new(Client::new(), url, "voxtral-mini-2507", "k");

        let err = client.transcribe(Bytes::new(), None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_transcribe_missing_text() {
        let router = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { Json(json!({"segments": []})) }),
        );
        let url = spawn(router).await;
        let client = TranscriptionClient::new(Client::new(), url, "voxtral-mini-2507", "k");

        let err = client.transcribe(Bytes::new(), None).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }
}
