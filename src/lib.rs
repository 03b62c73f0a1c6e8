//! seglru: a byte-budgeted segmented LRU cache and jump-hash node selection.
//!
//! - [`policy::slru`]: the two-segment eviction engine and its thread-safe
//!   wrapper.
//! - [`ds`]: the arena, intrusive list and node selector it is built from.
//! - [`group`] / [`http`]: named loader-backed caches and a request handler
//!   that serves them.

pub mod builder;
pub mod byte_view;
pub mod ds;
pub mod error;
pub mod group;
pub mod http;
pub mod policy;
pub mod prelude;
pub mod traits;

pub use crate::byte_view::ByteView;
