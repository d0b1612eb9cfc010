//! Snapshot storage with per-entry expiry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::keyring::SlotKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Keyed storage of immutable listing snapshots.
///
/// Implementations must treat stored snapshots as read-only; callers replace
/// or delete whole entries.
pub trait SnapshotStore<T>: Send + Sync {
    /// Return the snapshot under `key` unless it is missing or expired.
    fn get(&self, key: &SlotKey) -> Option<Arc<[T]>>;

    fn set(&self, key: &SlotKey, snapshot: Arc<[T]>, ttl: Duration);

    /// Remove `key`; deleting an absent key is a no-op.
    fn delete(&self, key: &SlotKey);
}

struct Entry<T> {
    snapshot: Arc<[T]>,
    expires_at: Instant,
}

/// Process-local [`SnapshotStore`].
pub struct MemorySnapshotStore<T> {
    entries: RwLock<HashMap<SlotKey, Entry<T>>>,
}

impl<T> MemorySnapshotStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &SlotKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains_key(key)
    }
}

impl<T> Default for MemorySnapshotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> SnapshotStore<T> for MemorySnapshotStore<T> {
    fn get(&self, key: &SlotKey) -> Option<Arc<[T]>> {
        let now = Instant::now();
        {
            let entries = rw_read(&self.entries, SOURCE, "get");
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(Arc::clone(&entry.snapshot)),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = rw_write(&self.entries, SOURCE, "get.expire");
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
        }
        None
    }

    fn set(&self, key: &SlotKey, snapshot: Arc<[T]>, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        rw_write(&self.entries, SOURCE, "set").insert(
            key.clone(),
            Entry {
                snapshot,
                expires_at,
            },
        );
    }

    fn delete(&self, key: &SlotKey) {
        rw_write(&self.entries, SOURCE, "delete").remove(key);
    }
}
