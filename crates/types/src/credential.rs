//! Inbound credential classification and the resolved upstream credential.

use crate::GatewayError;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;

/// Prefix of an OAuth access token issued for a Claude subscription session.
pub const ACCESS_PREFIX: &str = "sk-ant-oat";

/// Prefix of an OAuth refresh token. Single use: every exchange rotates it.
pub const ROTATING_PREFIX: &str = "sk-ant-ort";

/// Prefix of a Console API key.
pub const API_KEY_PREFIX: &str = "sk-ant-api";

/// The kind of a raw credential string, determined by its prefix alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Short-lived access token; forwarded unchanged as a Bearer token.
    Access,
    /// Refresh token; exchanged for an access token before use.
    Rotating,
    /// Console API key; forwarded unchanged via `x-api-key`.
    ApiKey,
}

impl CredentialKind {
    /// Classify a raw credential by prefix.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnrecognizedCredential`] if no known prefix matches.
    pub fn classify(raw: &str) -> Result<Self, GatewayError> {
        if raw.starts_with(ACCESS_PREFIX) {
            Ok(Self::Access)
        } else if raw.starts_with(ROTATING_PREFIX) {
            Ok(Self::Rotating)
        } else if raw.starts_with(API_KEY_PREFIX) {
            Ok(Self::ApiKey)
        } else {
            Err(GatewayError::UnrecognizedCredential)
        }
    }
}

/// A credential ready to be attached to an upstream Messages API request.
///
/// The secret never appears in `Debug` output.
#[derive(Debug)]
pub enum UpstreamCredential {
    /// OAuth session token, sent as `Authorization: Bearer`.
    Session(SecretString),
    /// Console API key, sent as `x-api-key`.
    ApiKey(SecretString),
}

impl UpstreamCredential {
    pub fn session(token: impl Into<String>) -> Self {
        Self::Session(SecretString::from(token.into()))
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::from(key.into()))
    }

    /// Session credentials require the short identity system prompt.
    #[must_use]
    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// Returns the raw secret for header construction.
    #[must_use]
    pub fn expose(&self) -> &str {
        match self {
            Self::Session(s) | Self::ApiKey(s) => s.expose_secret(),
        }
    }
}

/// Successful response of a refresh-token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// The rotated refresh token. Absent when the provider did not rotate.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_access() {
        assert_eq!(
            CredentialKind::classify("sk-ant-oat01-abc").unwrap(),
            CredentialKind::Access
        );
    }

    #[test]
    fn test_classify_rotating() {
        assert_eq!(
            CredentialKind::classify("sk-ant-ort01-abc").unwrap(),
            CredentialKind::Rotating
        );
    }

    #[test]
    fn test_classify_api_key() {
        assert_eq!(
            CredentialKind::classify("sk-ant-api03-abc").unwrap(),
            CredentialKind::ApiKey
        );
    }

    #[test]
    fn test_classify_unrecognized() {
        assert!(matches!(
            CredentialKind::classify("Bearer something"),
            Err(GatewayError::UnrecognizedCredential)
        ));
        assert!(CredentialKind::classify("").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cred = UpstreamCredential::session("sk-ant-oat01-very-secret");
        let dbg = format!("{cred:?}");
        assert!(!dbg.contains("very-secret"));
        assert_eq!(cred.expose(), "sk-ant-oat01-very-secret");
        assert!(cred.is_session());
        assert!(!UpstreamCredential::api_key("k").is_session());
    }

    #[test]
    fn test_token_grant_optional_fields() {
        let grant: TokenGrant = serde_json::from_str(r#"{"access_token":"at"}"#).unwrap();
        assert_eq!(grant.access_token, "at");
        assert!(grant.refresh_token.is_none());
        assert!(grant.expires_in.is_none());
    }
}
