//! Core types and traits for the chatgate workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! chat streaming gateway, including the error type, credential kinds, the
//! inbound chat payload, the downstream event catalog, and the async traits
//! that the auth and provider layers implement.

pub mod chat;
pub mod credential;
pub mod error;
pub mod event;
pub mod traits;

pub use chat::{ChatPayload, ConversationTurn, ModelChoice, Role};
pub use credential::{CredentialKind, TokenGrant, UpstreamCredential};
pub use error::GatewayError;
pub use event::DownstreamEvent;
pub use traits::{ByteStream, MessagesApi, TokenExchanger};
