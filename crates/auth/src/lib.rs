//! Upstream credential resolution.
//!
//! Raw credentials from the editor client are classified by prefix. Access
//! tokens and API keys pass through untouched; refresh tokens are exchanged
//! at the provider's OAuth endpoint and the result is cached per original
//! token, following the provider's single-use rotation.

pub mod cache;
pub mod claude;
pub mod resolver;

pub use cache::{CachedCredential, Clock, CredentialCache, SystemClock};
pub use claude::HttpTokenExchanger;
pub use resolver::CredentialResolver;
