//! Domain layer types and invariants.

pub mod catalog;
pub mod error;
pub mod pagination;
pub mod token;
pub mod types;
