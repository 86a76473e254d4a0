//! Resolves a raw inbound credential into an [`UpstreamCredential`].
//!
//! - Access tokens and API keys pass through unchanged, with no cache access.
//! - Refresh tokens are exchanged, at most once per call, using the most
//!   recently rotated refresh token known for the original.
//! - Anything else is rejected before any network call.

use crate::cache::{CachedCredential, Clock, CredentialCache, SystemClock, cache_key};
use chatgate_types::{CredentialKind, TokenExchanger, UpstreamCredential, traits::Result};
use std::sync::Arc;

pub struct CredentialResolver {
    cache: CredentialCache,
    exchanger: Arc<dyn TokenExchanger>,
    clock: Arc<dyn Clock>,
}

impl CredentialResolver {
    pub fn new(exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self::with_clock(exchanger, Arc::new(SystemClock))
    }

    pub fn with_clock(exchanger: Arc<dyn TokenExchanger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: CredentialCache::new(),
            exchanger,
            clock,
        }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Resolve `raw` into a credential usable against the Messages API.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnrecognizedCredential`] for an unknown prefix and
    /// [`GatewayError::AuthUpstream`] if a required exchange fails.
    ///
    /// [`GatewayError::UnrecognizedCredential`]: chatgate_types::GatewayError::UnrecognizedCredential
    /// [`GatewayError::AuthUpstream`]: chatgate_types::GatewayError::AuthUpstream
    pub async fn resolve(&self, raw: &str) -> Result<UpstreamCredential> {
        match CredentialKind::classify(raw)? {
            CredentialKind::Access => Ok(UpstreamCredential::session(raw)),
            CredentialKind::ApiKey => Ok(UpstreamCredential::api_key(raw)),
            CredentialKind::Rotating => self.access_for(raw).await.map(UpstreamCredential::session),
        }
    }

    async fn access_for(&self, original: &str) -> Result<String> {
        let key = cache_key(original);
        let short = &key[..8];
        let slot = self.cache.slot(&key);

        // Held across the exchange: a concurrent caller for the same key waits
        // here and then sees the freshly rotated entry.
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(self.clock.now_secs()) {
                tracing::debug!(key = short, "access credential cache hit");
                return Ok(cached.access_token.clone());
            }
        }

        let current_refresh = entry
            .as_ref()
            .map_or_else(|| original.to_string(), |c| c.refresh_token.clone());
        let rotated = entry.is_some();

        tracing::debug!(key = short, rotated, "exchanging refresh credential");
        let grant = match self.exchanger.exchange(&current_refresh).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(key = short, error = %e, "credential exchange failed");
                if !rotated {
                    drop(entry);
                    self.cache.discard_if_empty(&key, &slot);
                }
                return Err(e);
            }
        };

        let expires_at = self.clock.now_secs() + grant.expires_in.unwrap_or(0);
        *entry = Some(CachedCredential {
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.unwrap_or(current_refresh),
            expires_at,
        });
        tracing::info!(key = short, expires_at, "access credential refreshed");

        Ok(grant.access_token)
    }
}
