//! Navigation core for paginated, drill-down catalog search.
//!
//! Interactions come in as JSON events, search results are cached per
//! source, and every button or menu on a result message carries a compact
//! token naming the command, the behavior, the cache entry and a value.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
