//! Persistent stale-while-revalidate cache.
//!
//! Wraps a slow asynchronous producer so repeat reads are served from the
//! key-value store. Expired entries are still returned immediately while a
//! background task refreshes them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use warden_domain::{AuthError, AuthResult, CachedEntry};

use crate::ports::{Clock, KeyValueStore};

/// Per-call cache options.
#[derive(Clone, Default)]
pub struct CacheOptions {
    /// Days a produced value stays fresh. `None` or zero never expires.
    pub expiration_in_days: Option<u32>,
    /// Store to use instead of the cache's default store.
    pub store: Option<Arc<dyn KeyValueStore>>,
}

impl CacheOptions {
    /// Options with the given freshness window.
    #[must_use]
    pub fn expiring_in_days(days: u32) -> Self {
        Self {
            expiration_in_days: Some(days),
            store: None,
        }
    }

    /// Use `store` for this call.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("expiration_in_days", &self.expiration_in_days)
            .field("store", &self.store.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Where a cached call's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Unexpired entry; the producer was not called.
    Fresh,
    /// Expired entry; a background refresh was started.
    Stale,
    /// No usable entry; the producer was awaited.
    Produced,
}

/// A cached call result with its background refresh, if one was started.
#[derive(Debug)]
pub struct CachedCall<T> {
    /// Value returned to the caller.
    pub value: T,
    /// Where the value came from.
    pub source: CacheSource,
    /// The revalidation task for a stale hit. It never fails.
    pub refresh: Option<JoinHandle<()>>,
}

/// Stale-while-revalidate cache over a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistentCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl PersistentCache {
    /// Creates a cache persisting to `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the cached value under `key`, producing it if needed.
    ///
    /// - unexpired entry: returned, `producer` never called
    /// - expired entry: returned stale, `producer` run in the background
    /// - no entry: `producer` awaited and its value stored
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] for an empty key, or the
    /// producer's error when there was nothing cached to fall back on.
    pub async fn cached_call<T, F, Fut>(
        &self,
        key: &str,
        producer: F,
        options: CacheOptions,
    ) -> AuthResult<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AuthResult<T>> + Send + 'static,
    {
        self.cached_call_detailed(key, producer, options)
            .await
            .map(|call| call.value)
    }

    /// Like [`cached_call`](Self::cached_call) but also hands back the
    /// background refresh task so it can be awaited.
    ///
    /// # Errors
    ///
    /// Same as [`cached_call`](Self::cached_call).
    pub async fn cached_call_detailed<T, F, Fut>(
        &self,
        key: &str,
        producer: F,
        options: CacheOptions,
    ) -> AuthResult<CachedCall<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AuthResult<T>> + Send + 'static,
    {
        if key.trim().is_empty() {
            return Err(AuthError::invalid_argument("cache key is required"));
        }

        let store = options
            .store
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.store));
        let expiration_in_days = options.expiration_in_days;

        if let Some(entry) = read_entry::<T>(store.as_ref(), key) {
            if !entry.is_expired(self.clock.now()) {
                tracing::debug!(key, "cache hit");
                return Ok(CachedCall {
                    value: entry.data,
                    source: CacheSource::Fresh,
                    refresh: None,
                });
            }

            tracing::debug!(key, "cache entry stale, revalidating in background");
            let clock = Arc::clone(&self.clock);
            let key = key.to_string();
            let refresh = tokio::spawn(async move {
                match producer().await {
                    Ok(data) => {
                        let entry = CachedEntry::new(data, clock.now(), expiration_in_days);
                        if let Err(error) = write_entry(store.as_ref(), &key, &entry) {
                            tracing::warn!(key = %key, %error, "failed to store refreshed cache entry");
                        }
                    }
                    Err(error) => {
                        tracing::warn!(key = %key, %error, "background cache refresh failed");
                    }
                }
            });
            return Ok(CachedCall {
                value: entry.data,
                source: CacheSource::Stale,
                refresh: Some(refresh),
            });
        }

        tracing::debug!(key, "cache miss");
        let data = producer().await?;
        let entry = CachedEntry::new(data, self.clock.now(), expiration_in_days);
        if let Err(error) = write_entry(store.as_ref(), key, &entry) {
            tracing::warn!(key, %error, "failed to store cache entry");
        }
        Ok(CachedCall {
            value: entry.data,
            source: CacheSource::Produced,
            refresh: None,
        })
    }

    /// Reads the raw entry under `key` from the default store.
    ///
    /// Unreadable or unparseable entries read as `None`; unparseable ones are evicted.
    #[must_use]
    pub fn peek<T: DeserializeOwned>(&self, key: &str) -> Option<CachedEntry<T>> {
        read_entry(self.store.as_ref(), key)
    }

    /// Writes `entry` under `key` in the default store.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the entry cannot be serialized or written.
    pub fn put<T: Serialize>(&self, key: &str, entry: &CachedEntry<T>) -> AuthResult<()> {
        write_entry(self.store.as_ref(), key, entry)
    }

    /// Removes the entry under `key` from the default store.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be written.
    pub fn invalidate(&self, key: &str) -> AuthResult<()> {
        self.store.remove(key)
    }
}

impl fmt::Debug for PersistentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentCache").finish_non_exhaustive()
    }
}

fn read_entry<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<CachedEntry<T>> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(error) => {
            tracing::warn!(key, %error, "cache read failed, treating as miss");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            let error = AuthError::CacheParse {
                key: key.to_string(),
                message: e.to_string(),
            };
            tracing::warn!(%error, "evicting unparseable cache entry");
            if let Err(error) = store.remove(key) {
                tracing::warn!(key, %error, "failed to evict cache entry");
            }
            None
        }
    }
}

fn write_entry<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    entry: &CachedEntry<T>,
) -> AuthResult<()> {
    let raw = serde_json::to_string(entry).map_err(|e| AuthError::storage(e.to_string()))?;
    store.set(key, &raw)
}
