//! Pure translation between the editor's chat protocol and the Anthropic
//! Messages API. No I/O happens in this crate.
//!
//! - [`request`] builds the upstream request body from a [`ChatPayload`].
//! - [`sse`] splits a raw response body into lines.
//! - [`upstream`] models the upstream streaming events.
//! - [`translator`] maps upstream events onto [`DownstreamEvent`]s.
//! - [`response`] extracts the result of a non-streaming call.
//!
//! [`ChatPayload`]: chatgate_types::ChatPayload
//! [`DownstreamEvent`]: chatgate_types::DownstreamEvent

pub mod request;
pub mod response;
pub mod sse;
pub mod translator;
pub mod upstream;

pub use request::{
    APPLY_CODE_TOOL, PromptMode, RequestDefaults, SESSION_SYSTEM_PROMPT, build_request,
    probe_request,
};
pub use response::ChatReply;
pub use sse::LineDecoder;
pub use translator::{ProtocolTranslator, StreamFault};
pub use upstream::UpstreamEvent;
