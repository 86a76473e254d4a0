//! Configuration loading and hot-reloading for the chatgate server.
//!
//! Uses figment for YAML-based configuration with sensible defaults and
//! `CHATGATE_`-prefixed environment overrides, and notify + arc-swap for live
//! file watching.

pub mod schema;
pub mod watcher;

pub use schema::{ChatConfig, Config, LogConfig, LogFormat, TranscriptionConfig, UpstreamConfig};
pub use watcher::ConfigWatcher;
