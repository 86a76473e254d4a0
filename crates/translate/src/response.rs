//! Result extraction for non-streaming Messages API calls.

use crate::request::APPLY_CODE_TOOL;
use chatgate_types::{GatewayError, traits::Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a successful `POST /ai/chat` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    /// Full replacement script if the model called `apply_code`.
    pub applied_code: Option<String>,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl ChatReply {
    /// Fold the content blocks of a Messages API response into a reply.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidResponse`] if the body has no content
    /// blocks or does not look like a message.
    pub fn from_message(body: &Value) -> Result<Self> {
        let message = MessageBody::deserialize(body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if message.content.is_empty() {
            return Err(GatewayError::InvalidResponse("no content blocks".into()));
        }

        let mut response = String::new();
        let mut applied_code = None;
        for block in message.content {
            match block {
                ResponseBlock::Text { text } => response.push_str(&text),
                ResponseBlock::ToolUse { name, input } if name == APPLY_CODE_TOOL => {
                    let explanation = input
                        .get("explanation")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    applied_code = input.get("code").and_then(Value::as_str).map(str::to_owned);
                    response.push_str("✅ Code applied: ");
                    response.push_str(explanation);
                }
                ResponseBlock::ToolUse { .. } | ResponseBlock::Other => {}
            }
        }
        if response.is_empty() {
            response.push_str("Done!");
        }

        Ok(Self {
            response,
            applied_code,
        })
    }
}
