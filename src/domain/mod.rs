//! Domain layer types and invariants.

pub mod actor;
pub mod entities;
pub mod error;
pub mod milestone;
pub mod policy;
pub mod validation;
