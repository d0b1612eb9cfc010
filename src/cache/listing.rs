//! Cached listing retrieval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::debug;

use super::keyring::{CacheKeyring, SlotKey};
use super::store::SnapshotStore;

pub const HIT_TOTAL: &str = "skystore_listing_cache_hit_total";
pub const MISS_TOTAL: &str = "skystore_listing_cache_miss_total";
pub const INVALIDATE_TOTAL: &str = "skystore_listing_cache_invalidate_total";

/// Cache switches read from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub enabled: bool,
    pub ttl: Duration,
}

/// Listing cache for one namespace, partitioned by viewer role.
///
/// When disabled every call goes straight to the loader and nothing is stored.
pub struct ListingCache<T> {
    keyring: CacheKeyring,
    store: Arc<dyn SnapshotStore<T>>,
    enabled: bool,
    ttl: Duration,
}

impl<T> Clone for ListingCache<T> {
    fn clone(&self) -> Self {
        Self {
            keyring: self.keyring.clone(),
            store: Arc::clone(&self.store),
            enabled: self.enabled,
            ttl: self.ttl,
        }
    }
}

impl<T> ListingCache<T> {
    pub fn new(
        keyring: CacheKeyring,
        store: Arc<dyn SnapshotStore<T>>,
        enabled: bool,
        ttl: Duration,
    ) -> Self {
        Self {
            keyring,
            store,
            enabled,
            ttl,
        }
    }

    pub fn keyring(&self) -> &CacheKeyring {
        &self.keyring
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the role's snapshot, loading and storing it on a miss.
    pub async fn list<E, F, Fut>(&self, is_staff: bool, load: F) -> Result<Arc<[T]>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        let key = self.keyring.key_for(is_staff).clone();
        self.fetch(&key, load).await
    }

    /// Same as [`ListingCache::list`] for an arbitrary key in the shared store.
    pub async fn fetch<E, F, Fut>(&self, key: &SlotKey, load: F) -> Result<Arc<[T]>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        if !self.enabled {
            return load().await.map(Arc::from);
        }

        if let Some(snapshot) = self.store.get(key) {
            counter!(HIT_TOTAL, "namespace" => self.keyring.namespace()).increment(1);
            return Ok(snapshot);
        }

        counter!(MISS_TOTAL, "namespace" => self.keyring.namespace()).increment(1);
        debug!(
            target = "skystore::cache::listing",
            key = %key,
            "listing cache miss"
        );

        let snapshot: Arc<[T]> = Arc::from(load().await?);
        self.store.set(key, Arc::clone(&snapshot), self.ttl);
        Ok(snapshot)
    }

    /// Drop both role variants of this namespace.
    pub fn invalidate(&self) {
        counter!(INVALIDATE_TOTAL, "namespace" => self.keyring.namespace()).increment(1);
        self.keyring.invalidate_all(self.store.as_ref());
    }

    /// Drop a single scoped key.
    pub fn invalidate_key(&self, key: &SlotKey) {
        counter!(INVALIDATE_TOTAL, "namespace" => self.keyring.namespace()).increment(1);
        self.store.delete(key);
    }
}
