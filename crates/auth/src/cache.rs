//! Process-wide cache of exchanged access credentials.
//!
//! Entries are keyed by the SHA-256 of the refresh token the client first
//! presented, never by the rotated value, so rotation does not fragment the
//! cache. Each key owns an async slot; holding the slot lock across a refresh
//! serializes exchanges per key, which is what keeps a superseded refresh
//! token from ever being sent twice.
//!
//! Entries are never swept: an expired entry still holds the only valid
//! refresh token for its key. A slot whose first exchange failed is dropped
//! again, so rejected tokens leave nothing behind.

use sha2::{Digest as _, Sha256};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A cached entry is reused only while it stays valid this much longer.
pub const EXPIRY_GRACE_SECS: u64 = 60;

/// Source of wall-clock time in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// [`Clock`] backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

/// The current state of one rotating credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCredential {
    pub access_token: String,
    /// Latest refresh token; replaces the original after the first exchange.
    pub refresh_token: String,
    /// Unix seconds at which `access_token` expires.
    pub expires_at: u64,
}

impl CachedCredential {
    /// Return `true` if the access token outlives the grace window.
    #[must_use]
    pub fn is_fresh(&self, now: u64) -> bool {
        self.expires_at > now + EXPIRY_GRACE_SECS
    }
}

/// Per-key slot. `None` until the first successful exchange.
pub type CacheSlot = Arc<tokio::sync::Mutex<Option<CachedCredential>>>;

/// Hash a raw refresh token into its cache key (lowercase hex SHA-256).
#[must_use]
pub fn cache_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Map from cache key to its slot.
#[derive(Default)]
pub struct CredentialCache {
    slots: Mutex<HashMap<String, CacheSlot>>,
}

impl CredentialCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the slot for `key`, creating an empty one on first use.
    #[must_use]
    pub fn slot(&self, key: &str) -> CacheSlot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Drop the slot for `key` if it never received a credential and nobody
    /// else holds it. Called after a failed first exchange so rejected tokens
    /// do not accumulate.
    pub fn discard_if_empty(&self, key: &str, slot: &CacheSlot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(stored) = slots.get(key) else {
            return;
        };
        // the map's reference plus the caller's
        if !Arc::ptr_eq(stored, slot) || Arc::strong_count(slot) > 2 {
            return;
        }
        if slot.try_lock().is_ok_and(|entry| entry.is_none()) {
            slots.remove(key);
        }
    }

    /// Snapshot of the entry for `key`, if one has been stored.
    #[cfg(test)]
    pub(crate) async fn get(&self, key: &str) -> Option<CachedCredential> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(key).cloned()
        }?;
        slot.lock().await.clone()
    }

    /// Number of keys currently held.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
