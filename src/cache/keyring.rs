//! Role-partitioned cache keys.
//!
//! Every cached listing exists in two variants: one that includes drafts for
//! staff and one with published entries only. A [`CacheKeyring`] maps the
//! viewer role to the slot for a namespace and clears both on writes.

use std::fmt::{Display, Formatter};

use tracing::debug;

use super::store::SnapshotStore;

/// Catalog home listing.
pub const HOME_PRODUCTS: &str = "home:products";
/// Blog listing.
pub const BLOG_POSTS: &str = "blog:posts";
/// Prefix of the per-category public product listings.
pub const CATEGORY_PRODUCTS: &str = "category_products";

const STAFF_SUFFIX: &str = "staff";
const PUBLIC_SUFFIX: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey(String);

impl SlotKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// `{prefix}:{id}` key for listings scoped to one parent entity.
    pub fn scoped(prefix: &str, id: impl Display) -> Self {
        Self(format!("{prefix}:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading segment before the first `:`.
    pub fn namespace(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }
}

impl Display for SlotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CacheKeyring {
    namespace: &'static str,
    staff: SlotKey,
    public: SlotKey,
}

impl CacheKeyring {
    pub fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            staff: SlotKey(format!("{namespace}:{STAFF_SUFFIX}")),
            public: SlotKey(format!("{namespace}:{PUBLIC_SUFFIX}")),
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn key_for(&self, is_staff: bool) -> &SlotKey {
        if is_staff { &self.staff } else { &self.public }
    }

    pub fn keys(&self) -> [&SlotKey; 2] {
        [&self.staff, &self.public]
    }

    /// Delete both role variants from `store`. Safe to call repeatedly.
    pub fn invalidate_all<T, S>(&self, store: &S)
    where
        S: SnapshotStore<T> + ?Sized,
    {
        for key in self.keys() {
            store.delete(key);
        }
        debug!(
            target = "skystore::cache::keyring",
            namespace = self.namespace,
            "invalidated listing slots"
        );
    }
}
