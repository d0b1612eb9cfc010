//! In-process listing cache.
//!
//! - [`keyring`]: role-partitioned slot keys per listing namespace
//! - [`store`]: snapshot storage with expiry
//! - [`listing`]: read-through retrieval used by the services

pub mod keyring;
pub mod listing;
mod lock;
pub mod store;

pub use keyring::{BLOG_POSTS, CATEGORY_PRODUCTS, CacheKeyring, HOME_PRODUCTS, SlotKey};
pub use listing::{CacheOptions, ListingCache};
pub use store::{MemorySnapshotStore, SnapshotStore};
