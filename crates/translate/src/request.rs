//! Builds Anthropic Messages API request bodies from a [`ChatPayload`].
//!
//! Session credentials only authorize requests whose system prompt is exactly
//! [`SESSION_SYSTEM_PROMPT`], so the editor context cannot ride in the system
//! prompt on that path. Instead every request starts with a synthetic
//! user/assistant exchange carrying the code and diagnostics; API keys also
//! get the context in an extended system prompt.

use chatgate_types::{
    ChatPayload, ConversationTurn, GatewayError, ModelChoice, UpstreamCredential, traits::Result,
};
use serde_json::{Value, json};

/// Identity prompt required byte-for-byte by the session authorization mode.
pub const SESSION_SYSTEM_PROMPT: &str = "You are Claude Code, Anthropic's official CLI for Claude.";

const ROLE_PROMPT: &str = "You are a helpful assistant for OpenWorkers, a Cloudflare Workers-compatible runtime.\nThe user is editing a worker script. Help them with their code.";

const CONTEXT_TEMPLATE: &str = include_str!("context_prompt.txt");

/// Assistant turn acknowledging the injected context.
pub const CONTEXT_ACK: &str = "I understand. I'll help you with your OpenWorkers code.";

/// Name of the single tool declared on every chat request.
pub const APPLY_CODE_TOOL: &str = "apply_code";

/// Output token limit without extended reasoning.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Floor for the output token limit with extended reasoning.
pub const THINKING_MIN_MAX_TOKENS: u32 = 16_384;

/// Headroom above the thinking budget left for the visible answer.
pub const THINKING_HEADROOM: u32 = 8192;

/// Which system prompt a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Short identity prompt only.
    Session,
    /// Identity, role description, and the editor context.
    Extended,
}

impl PromptMode {
    #[must_use]
    pub fn for_credential(credential: &UpstreamCredential) -> Self {
        if credential.is_session() {
            Self::Session
        } else {
            Self::Extended
        }
    }
}

/// Deployment defaults applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct RequestDefaults {
    pub model: ModelChoice,
    pub thinking_budget: u32,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            model: ModelChoice::Sonnet,
            thinking_budget: 16_384,
        }
    }
}

/// JSON definition of the `apply_code` tool.
#[must_use]
pub fn apply_code_tool() -> Value {
    json!({
        "name": APPLY_CODE_TOOL,
        "description": "Apply new code to the editor. Use this when the user asks to modify, fix, update, or change the code. This will replace the entire code in the editor.",
        "input_schema": {
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The complete updated TypeScript/JavaScript code to apply to the editor"
                },
                "explanation": {
                    "type": "string",
                    "description": "Brief explanation of what was changed"
                }
            },
            "required": ["code", "explanation"]
        }
    })
}

/// Render the editor context block for `code` and `diagnostics`.
#[must_use]
pub fn context_prompt(code: &str, diagnostics: &[String]) -> String {
    let diagnostics_text = if diagnostics.is_empty() {
        String::new()
    } else {
        format!("\n\nTypeScript diagnostics:\n{}", diagnostics.join("\n"))
    };
    // Split once instead of chained `replace` so placeholder text inside the
    // user's code is never substituted.
    let Some((head, rest)) = CONTEXT_TEMPLATE.split_once("{{CODE}}") else {
        return format!("{CONTEXT_TEMPLATE}{code}{diagnostics_text}");
    };
    let Some((mid, tail)) = rest.split_once("{{DIAGNOSTICS}}") else {
        return format!("{head}{code}{rest}{diagnostics_text}");
    };
    format!("{head}{code}{mid}{diagnostics_text}{tail}")
}

/// System prompt for `mode`. `context` is only used by [`PromptMode::Extended`].
#[must_use]
pub fn system_prompt(mode: PromptMode, context: &str) -> String {
    match mode {
        PromptMode::Session => SESSION_SYSTEM_PROMPT.to_string(),
        PromptMode::Extended => format!("{SESSION_SYSTEM_PROMPT}\n{ROLE_PROMPT}\n\n{context}"),
    }
}

/// Output token limit for a request.
#[must_use]
pub fn max_tokens(thinking_budget: Option<u32>) -> u32 {
    match thinking_budget {
        Some(budget) => THINKING_MIN_MAX_TOKENS.max(budget.saturating_add(THINKING_HEADROOM)),
        None => DEFAULT_MAX_TOKENS,
    }
}

/// Build the Messages API body for `payload`.
///
/// `stream` selects the streaming variant. Turn order is: context, context
/// acknowledgement, prior turns, new user message.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the user message is blank.
pub fn build_request(
    payload: &ChatPayload,
    mode: PromptMode,
    defaults: RequestDefaults,
    stream: bool,
) -> Result<Value> {
    if payload.is_blank() {
        return Err(GatewayError::InvalidRequest("No message provided".into()));
    }

    let model = ModelChoice::resolve(payload.model.as_deref(), defaults.model);
    let thinking_budget = payload
        .enable_thinking
        .then(|| payload.thinking_budget.unwrap_or(defaults.thinking_budget));

    let context = context_prompt(&payload.code, &payload.diagnostics);
    let mut messages = Vec::with_capacity(payload.messages.len() + 3);
    messages.push(ConversationTurn::user(context.clone()));
    messages.push(ConversationTurn::assistant(CONTEXT_ACK));
    messages.extend(payload.messages.iter().cloned());
    messages.push(ConversationTurn::user(payload.user_message.clone()));

    let mut body = json!({
        "model": model.model_id(),
        "max_tokens": max_tokens(thinking_budget),
        "system": system_prompt(mode, &context),
        "tools": [apply_code_tool()],
        "messages": messages,
    });
    if stream {
        body["stream"] = Value::Bool(true);
    }
    if let Some(budget) = thinking_budget {
        body["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
    }

    tracing::debug!(
        model = model.model_id(),
        ?mode,
        turns = messages_len(&body),
        thinking = thinking_budget.is_some(),
        "built messages request"
    );
    Ok(body)
}

/// Minimal one-token request used to check that a credential is accepted.
#[must_use]
pub fn probe_request(model: ModelChoice) -> Value {
    json!({
        "model": model.model_id(),
        "max_tokens": 1,
        "system": SESSION_SYSTEM_PROMPT,
        "messages": [{"role": "user", "content": "Hi"}],
    })
}

fn messages_len(body: &Value) -> usize {
    body.get("messages")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgate_types::Role;

    fn payload(msg: &str) -> ChatPayload {
        ChatPayload {
            code: "export default { fetch() {} }".into(),
            user_message: msg.into(),
            ..ChatPayload::default()
        }
    }

    #[test]
    fn test_blank_message_rejected() {
        for msg in ["", "   ", "\n\t"] {
            let err = build_request(
                &payload(msg),
                PromptMode::Session,
                RequestDefaults::default(),
                true,
            )
            .unwrap_err();
            assert!(matches!(err, GatewayError::InvalidRequest(_)));
        }
    }

    #[test]
    fn test_session_prompt_is_exact() {
        let body = build_request(
            &payload("hi"),
            PromptMode::Session,
            RequestDefaults::default(),
            true,
        )
        .unwrap();
        assert_eq!(
            body["system"],
            "You are Claude Code, Anthropic's official CLI for Claude."
        );
    }

    #[test]
    fn test_extended_prompt_carries_context() {
        let mut p = payload("hi");
        p.diagnostics = vec!["TS2304: Cannot find name 'env'.".into()];
        let body =
            build_request(&p, PromptMode::Extended, RequestDefaults::default(), false).unwrap();
        let system = body["system"].as_str().unwrap();
        assert!(system.starts_with(SESSION_SYSTEM_PROMPT));
        assert!(system.contains("OpenWorkers"));
        assert!(system.contains("export default { fetch() {} }"));
        assert!(system.contains("TS2304"));
    }

    #[test]
    fn test_turn_order() {
        let mut p = payload("now add logging");
        p.messages = vec![
            ConversationTurn::user("what does this do?"),
            ConversationTurn::assistant("it returns nothing"),
        ];
        let body =
            build_request(&p, PromptMode::Session, RequestDefaults::default(), true).unwrap();
        let turns: Vec<ConversationTurn> =
            serde_json::from_value(body["messages"].clone()).unwrap();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[0].role, Role::User);
        assert!(turns[0].content.contains("export default { fetch() {} }"));
        assert_eq!(turns[1], ConversationTurn::assistant(CONTEXT_ACK));
        assert_eq!(turns[2].content, "what does this do?");
        assert_eq!(turns[3].content, "it returns nothing");
        assert_eq!(turns[4], ConversationTurn::user("now add logging"));
    }

    #[test]
    fn test_token_budget() {
        assert_eq!(max_tokens(None), 8192);
        assert_eq!(max_tokens(Some(1024)), 16_384);
        assert_eq!(max_tokens(Some(8192)), 16_384);
        assert_eq!(max_tokens(Some(16_384)), 24_576);
        assert_eq!(max_tokens(Some(u32::MAX)), u32::MAX);
    }

    #[test]
    fn test_thinking_block() {
        let mut p = payload("think hard");
        p.enable_thinking = true;
        let body =
            build_request(&p, PromptMode::Session, RequestDefaults::default(), true).unwrap();
        assert_eq!(
            body["thinking"],
            json!({"type": "enabled", "budget_tokens": 16_384})
        );
        assert_eq!(body["max_tokens"], 24_576);

        p.thinking_budget = Some(4096);
        let body =
            build_request(&p, PromptMode::Session, RequestDefaults::default(), true).unwrap();
        assert_eq!(body["thinking"]["budget_tokens"], 4096);
        assert_eq!(body["max_tokens"], 16_384);

        // budget without the toggle is ignored
        p.enable_thinking = false;
        let body =
            build_request(&p, PromptMode::Session, RequestDefaults::default(), true).unwrap();
        assert!(body.get("thinking").is_none());
        assert_eq!(body["max_tokens"], 8192);
    }

    #[test]
    fn test_single_apply_code_tool() {
        let body = build_request(
            &payload("hi"),
            PromptMode::Session,
            RequestDefaults::default(),
            true,
        )
        .unwrap();
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "apply_code");
        assert_eq!(
            tools[0]["input_schema"]["required"],
            json!(["code", "explanation"])
        );
    }

    #[test]
    fn test_model_and_stream_flag() {
        let mut p = payload("hi");
        p.model = Some("haiku".into());
        let body =
            build_request(&p, PromptMode::Session, RequestDefaults::default(), true).unwrap();
        assert_eq!(body["model"], "claude-haiku-4-5");
        assert_eq!(body["stream"], true);

        p.model = Some("gpt-4o".into());
        let defaults = RequestDefaults {
            model: ModelChoice::Opus,
            ..RequestDefaults::default()
        };
        let body = build_request(&p, PromptMode::Session, defaults, false).unwrap();
        assert_eq!(body["model"], "claude-opus-4-5");
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn test_context_prompt_rendering() {
        let ctx = context_prompt("let a = 1;", &[]);
        assert!(ctx.contains("let a = 1;"));
        assert!(!ctx.contains("{{CODE}}"));
        assert!(!ctx.contains("{{DIAGNOSTICS}}"));
        assert!(!ctx.contains("TypeScript diagnostics"));

        let ctx = context_prompt("x", &["first".into(), "second".into()]);
        assert!(ctx.contains("\n\nTypeScript diagnostics:\nfirst\nsecond"));

        // placeholders inside user code are left alone
        let ctx = context_prompt("// {{DIAGNOSTICS}}", &["d".into()]);
        assert!(ctx.contains("// {{DIAGNOSTICS}}"));
    }

    #[test]
    fn test_probe_request() {
        let body = probe_request(ModelChoice::Sonnet);
        assert_eq!(body["max_tokens"], 1);
        assert_eq!(body["system"], SESSION_SYSTEM_PROMPT);
        assert_eq!(body["model"], "claude-sonnet-4-5");
    }

    #[test]
    fn test_prompt_mode_for_credential() {
        assert_eq!(
            PromptMode::for_credential(&UpstreamCredential::session("sk-ant-oat01-x")),
            PromptMode::Session
        );
        assert_eq!(
            PromptMode::for_credential(&UpstreamCredential::api_key("sk-ant-api03-x")),
            PromptMode::Extended
        );
    }
}
