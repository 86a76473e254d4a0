//! Upstream → downstream event translation.
//!
//! Each upstream event produces at most one downstream event, in arrival
//! order. Tool arguments stream in as JSON fragments; they are buffered while
//! the tool-use block is open and parsed exactly once when it closes.
//!
//! Two conditions are absorbed here instead of failing the stream: a corrupt
//! event line is skipped, and tool arguments that do not parse drop that one
//! result. Both are logged at `debug` as a [`StreamFault`].

use crate::sse::data_payload;
use crate::upstream::{BlockDelta, ContentBlock, UpstreamEvent};
use chatgate_types::DownstreamEvent;
use serde::Deserialize;
use thiserror::Error;

/// A locally recovered stream defect.
#[derive(Debug, Error)]
pub enum StreamFault {
    #[error("malformed event line: {0}")]
    Corruption(#[source] serde_json::Error),
    #[error("unparsable tool arguments for {tool}: {source}")]
    ToolArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Which kind of content block is currently open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    #[default]
    None,
    ToolUse,
    Thinking,
}

/// Per-request translation state.
#[derive(Debug, Default)]
pub struct TranslationState {
    pub block: BlockKind,
    pub tool_name: String,
    /// Concatenated `input_json_delta` fragments of the open tool block.
    pub tool_arguments: String,
}

/// Arguments of the `apply_code` tool.
#[derive(Debug, Deserialize)]
struct ApplyCodeInput {
    code: String,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Default)]
pub struct ProtocolTranslator {
    state: TranslationState,
    finished: bool,
}

impl ProtocolTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &TranslationState {
        &self.state
    }

    /// `true` once `message_stop` has been translated into `done`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Translate one raw SSE line. Non-`data:` lines, the `[DONE]` sentinel,
    /// and lines whose JSON does not parse yield `None`.
    pub fn feed_line(&mut self, line: &str) -> Option<DownstreamEvent> {
        let data = data_payload(line)?;
        if data == "[DONE]" {
            return None;
        }
        match serde_json::from_str::<UpstreamEvent>(data) {
            Ok(event) => self.translate(event),
            Err(e) => {
                let fault = StreamFault::Corruption(e);
                tracing::debug!(error = %fault, "skipping upstream line");
                None
            }
        }
    }

    /// Translate one decoded upstream event.
    pub fn translate(&mut self, event: UpstreamEvent) -> Option<DownstreamEvent> {
        match event {
            UpstreamEvent::MessageStart { message } => Some(DownstreamEvent::MessageStart {
                id: message.id,
                model: message.model,
                usage: message.usage,
            }),
            UpstreamEvent::Ping => Some(DownstreamEvent::Ping),
            UpstreamEvent::Error { error } => Some(DownstreamEvent::Error {
                message: error.message.unwrap_or_else(|| "Unknown error".to_string()),
                error_type: error.kind,
            }),
            UpstreamEvent::ContentBlockStart { content_block } => self.open_block(content_block),
            UpstreamEvent::ContentBlockDelta { delta } => self.apply_delta(delta),
            UpstreamEvent::ContentBlockStop => self.close_block(),
            UpstreamEvent::MessageDelta { delta, usage } => Some(DownstreamEvent::MessageDelta {
                stop_reason: delta.stop_reason,
                usage,
            }),
            UpstreamEvent::MessageStop => {
                self.finished = true;
                Some(DownstreamEvent::Done)
            }
            UpstreamEvent::Unknown => None,
        }
    }

    fn open_block(&mut self, block: ContentBlock) -> Option<DownstreamEvent> {
        match block {
            ContentBlock::ToolUse { name, .. } => {
                self.state.block = BlockKind::ToolUse;
                self.state.tool_arguments.clear();
                self.state.tool_name.clone_from(&name);
                Some(DownstreamEvent::CodeStart { tool: name })
            }
            ContentBlock::Thinking { .. } => {
                self.state.block = BlockKind::Thinking;
                Some(DownstreamEvent::ThinkingStart)
            }
            ContentBlock::Text { .. } | ContentBlock::Other => None,
        }
    }

    fn apply_delta(&mut self, delta: BlockDelta) -> Option<DownstreamEvent> {
        match delta {
            BlockDelta::TextDelta { text } => Some(DownstreamEvent::Text { content: text }),
            BlockDelta::InputJsonDelta { partial_json } => {
                // Arguments are only buffered inside a tool block; a stray
                // fragment still reports its own size.
                if self.state.block != BlockKind::ToolUse {
                    return Some(DownstreamEvent::CodeProgress {
                        bytes: partial_json.len(),
                    });
                }
                self.state.tool_arguments.push_str(&partial_json);
                Some(DownstreamEvent::CodeProgress {
                    bytes: self.state.tool_arguments.len(),
                })
            }
            BlockDelta::ThinkingDelta { thinking } => {
                Some(DownstreamEvent::Thinking { content: thinking })
            }
            // Signatures authenticate thinking blocks for the upstream only.
            BlockDelta::SignatureDelta | BlockDelta::Other => None,
        }
    }

    fn close_block(&mut self) -> Option<DownstreamEvent> {
        match self.state.block {
            BlockKind::ToolUse => {
                let state = std::mem::take(&mut self.state);
                match serde_json::from_str::<ApplyCodeInput>(&state.tool_arguments) {
                    Ok(input) => Some(DownstreamEvent::CodeComplete {
                        code: input.code,
                        explanation: input.explanation,
                    }),
                    Err(source) => {
                        let fault = StreamFault::ToolArguments {
                            tool: state.tool_name,
                            source,
                        };
                        tracing::debug!(error = %fault, "dropping tool result");
                        None
                    }
                }
            }
            BlockKind::Thinking => {
                self.state = TranslationState::default();
                Some(DownstreamEvent::ThinkingStop)
            }
            BlockKind::None => None,
        }
    }
}
