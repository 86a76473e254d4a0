//! Strongly-typed chat request payload shared by the streaming and
//! non-streaming chat routes.
//!
//! The conversation history is owned by the client and sent in full with
//! every request; nothing here is persisted.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treat an explicit JSON `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single prior exchange entry, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Model family selectable by the editor client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    Haiku,
    Sonnet,
    Opus,
}

impl ModelChoice {
    /// The upstream model identifier for this choice.
    #[must_use]
    pub fn model_id(self) -> &'static str {
        match self {
            Self::Haiku => "claude-haiku-4-5",
            Self::Sonnet => "claude-sonnet-4-5",
            Self::Opus => "claude-opus-4-5",
        }
    }

    /// Resolve an optional client-supplied alias, falling back to `default`
    /// for absent or unknown values.
    #[must_use]
    pub fn resolve(alias: Option<&str>, default: Self) -> Self {
        alias.and_then(|a| a.parse().ok()).unwrap_or(default)
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Haiku => write!(f, "haiku"),
            Self::Sonnet => write!(f, "sonnet"),
            Self::Opus => write!(f, "opus"),
        }
    }
}

impl std::str::FromStr for ModelChoice {
    type Err = crate::GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "haiku" => Ok(Self::Haiku),
            "sonnet" => Ok(Self::Sonnet),
            "opus" => Ok(Self::Opus),
            other => Err(crate::GatewayError::InvalidRequest(format!(
                "unknown model: {other}"
            ))),
        }
    }
}

/// Body of `POST /ai/chat` and `POST /ai/chat/stream`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    /// Current source of the worker script being edited.
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    /// Compiler diagnostics for `code`, one message per entry.
    #[serde(default, deserialize_with = "null_as_default")]
    pub diagnostics: Vec<String>,
    /// Prior conversation turns.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ConversationTurn>,
    /// The new user message. Must not be blank.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_message: String,
    /// Model alias (`haiku` / `sonnet` / `opus`). Unknown values fall back to the default.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable_thinking: bool,
    #[serde(default)]
    pub thinking_budget: Option<u32>,
}

impl ChatPayload {
    /// Returns `true` if the user message is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.user_message.trim().is_empty()
    }
}
