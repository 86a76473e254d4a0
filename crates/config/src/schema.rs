use chatgate_types::ModelChoice;
use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix for environment overrides; `__` separates nested keys
/// (e.g. `CHATGATE_TRANSCRIPTION__API_KEY`).
pub const ENV_PREFIX: &str = "CHATGATE_";

fn default_port() -> u16 {
    7000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Upstream Messages API and OAuth token endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub messages_url: String,
    pub token_url: String,
    /// OAuth client ID presented on refresh-token exchanges.
    pub client_id: String,
    pub anthropic_version: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            messages_url: "https://api.anthropic.com/v1/messages".to_string(),
            token_url: "https://console.anthropic.com/v1/oauth/token".to_string(),
            client_id: "9d1c250a-e61b-44d9-88ed-5944d1962f5e".to_string(),
            anthropic_version: "2023-06-01".to_string(),
        }
    }
}

/// Chat route behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Model used when the request names none or an unknown one.
    pub default_model: ModelChoice,
    /// Thinking budget used when extended reasoning is requested without one.
    pub default_thinking_budget: u32,
    /// Silence on the upstream stream longer than this produces a `ping`.
    pub heartbeat_interval_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: ModelChoice::Sonnet,
            default_thinking_budget: 16_384,
            heartbeat_interval_ms: 2_000,
        }
    }
}

/// Audio transcription passthrough. Disabled unless `api_key` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: "https://api.mistral.ai/v1/audio/transcriptions".to_string(),
            model: "voxtral-mini-2507".to_string(),
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen port (defaults to 7000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen address (defaults to `127.0.0.1`).
    #[serde(default = "default_host")]
    pub host: String,
    /// Optional proxy for all outbound HTTP traffic.
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            proxy_url: None,
            upstream: UpstreamConfig::default(),
            chat: ChatConfig::default(),
            transcription: TranscriptionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads configuration from a file path, merged with defaults and
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &std::path::Path) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Loads defaults merged with environment overrides only.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if an override has the wrong type.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.chat.heartbeat_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
port: 9000
host: "0.0.0.0"
chat:
  default_model: opus
  heartbeat_interval_ms: 500
transcription:
  api_key: "mistral-test"
log:
  format: json
"#;

    #[test]
    fn test_default_config() {
        let c = Config::default();
        assert_eq!(c.port, 7000);
        assert_eq!(c.host, "127.0.0.1");
        assert!(c.proxy_url.is_none());
        assert_eq!(c.chat.default_model, ModelChoice::Sonnet);
        assert_eq!(c.chat.default_thinking_budget, 16_384);
        assert_eq!(c.heartbeat_interval(), Duration::from_secs(2));
        assert!(c.transcription.api_key.is_none());
        assert_eq!(c.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_from_yaml_port_and_host() {
        let c = Config::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.host, "0.0.0.0");
    }

    #[test]
    fn test_from_yaml_nested_sections() {
        let c = Config::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(c.chat.default_model, ModelChoice::Opus);
        assert_eq!(c.heartbeat_interval(), Duration::from_millis(500));
        // unspecified nested fields keep their defaults
        assert_eq!(c.chat.default_thinking_budget, 16_384);
        assert_eq!(c.transcription.api_key.as_deref(), Some("mistral-test"));
        assert_eq!(c.transcription.model, "voxtral-mini-2507");
        assert_eq!(c.log.format, LogFormat::Json);
        assert_eq!(c.log.level, "info");
    }

    #[test]
    fn test_from_yaml_defaults_applied() {
        let c = Config::from_yaml("port: 1234").unwrap();
        assert_eq!(c.port, 1234);
        assert_eq!(c.host, "127.0.0.1");
        assert_eq!(
            c.upstream.token_url,
            "https://console.anthropic.com/v1/oauth/token"
        );
    }

    #[test]
    fn test_from_yaml_rejects_unknown_model() {
        assert!(Config::from_yaml("chat:\n  default_model: gpt\n").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: 8000\n")?;
            jail.set_env("CHATGATE_PORT", "8100");
            jail.set_env("CHATGATE_TRANSCRIPTION__API_KEY", "from-env");
            let c = Config::from_file(std::path::Path::new("config.yaml"))?;
            assert_eq!(c.port, 8100);
            assert_eq!(c.transcription.api_key.as_deref(), Some("from-env"));
            Ok(())
        });
    }
}
