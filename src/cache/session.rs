//! Session handle index.
//!
//! Maps the opaque handle embedded in navigation tokens to the content key
//! of the result set it browses. A handle is indexed before any response
//! referencing it is sent, so every later interaction can resolve it no
//! matter which task serves it.

use std::num::NonZeroUsize;
use std::time::Duration;

use metrics::counter;
use tracing::debug;

use super::keys::mint_session_handle;
use super::store::{CacheMiss, CacheStore, Expiring};

const METRIC_SESSION_MINTED: &str = "kurohelper_session_minted_total";

pub struct SessionIndex {
    store: CacheStore<String, String>,
}

impl SessionIndex {
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            store: CacheStore::new("sessions", ttl, capacity),
        }
    }

    /// Mint a handle for `content_key` and index it.
    pub fn open(&self, content_key: &str) -> String {
        let handle = mint_session_handle();
        self.store.set(handle.clone(), content_key.to_string());
        counter!(METRIC_SESSION_MINTED).increment(1);
        debug!(session = %handle, content_key, "Session indexed");
        handle
    }

    /// Resolve a handle to its content key.
    pub fn resolve(&self, handle: &str) -> Result<String, CacheMiss> {
        self.store.get(handle)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Expiring for SessionIndex {
    fn name(&self) -> &'static str {
        self.store.name()
    }

    fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }
}
