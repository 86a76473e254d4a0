//! Upstream clients and the streaming pipeline.
//!
//! - [`ClaudeClient`] implements [`MessagesApi`] over the Anthropic Messages API.
//! - [`KeepaliveReader`] races a single outstanding body read against a
//!   heartbeat interval.
//! - [`downstream_events`] turns an upstream SSE body into the downstream
//!   event stream.
//! - [`TranscriptionClient`] forwards audio to the transcription provider.
//!
//! [`MessagesApi`]: chatgate_types::MessagesApi

pub mod claude;
pub mod http_util;
pub mod keepalive;
pub mod mistral;
pub mod stream;

pub use claude::ClaudeClient;
pub use http_util::ProviderHttp;
pub use keepalive::{KeepaliveReader, ReadEvent};
pub use mistral::TranscriptionClient;
pub use stream::{EventStream, STREAM_ERROR, downstream_events};
