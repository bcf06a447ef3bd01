//! Kurohelper cache layer.
//!
//! Three kinds of state live here:
//!
//! - **Result stores**: full search result sets keyed by content key
//! - **Detail stores**: single catalog entries keyed by item id
//! - **Session index**: opaque handle to content key (or to an entry key
//!   for an opened detail), so navigation tokens stay short
//!
//! Every store shares one TTL and is swept periodically by
//! [`ExpirySweeper`].
//!
//! ## Configuration
//!
//! Read into [`crate::config::CacheSettings`] from `kurohelper.toml`:
//!
//! ```toml
//! [cache]
//! ttl_seconds = 1800
//! result_capacity = 500
//! session_capacity = 10000
//! sweep_interval_seconds = 60
//! ```

mod keys;
mod lock;
mod session;
mod store;
mod sweeper;

pub use keys::{content_key, entry_key, mint_session_handle, parse_entry_key};
pub use session::SessionIndex;
pub use store::{CacheMiss, CacheStore, Expiring};
pub use sweeper::ExpirySweeper;
