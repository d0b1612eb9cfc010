//! Application layer: use cases orchestrating domain rules and persistence.

pub mod accounts;
pub mod blog;
pub mod catalog;
pub mod error;
pub mod notify;
pub mod repos;
pub mod seed;
pub mod sessions;
