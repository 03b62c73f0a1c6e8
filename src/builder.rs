//! Builder for the segmented LRU engine and its concurrent wrapper.
//!
//! Collects the byte budget and an optional eviction hook, then produces
//! either a single-threaded [`SegmentedLru`] or a lazily initialised
//! [`ConcurrentSegmentedLru`].
//!
//! ## Example
//!
//! ```rust
//! use seglru::builder::CacheBuilder;
//!
//! let mut cache = CacheBuilder::new(1 << 20)
//!     .on_evicted(|key: &str, value: &String| println!("dropped {key} ({} bytes)", value.len()))
//!     .build();
//! cache.put("hello", "world".to_string());
//! assert_eq!(cache.get("hello"), Some(&"world".to_string()));
//! ```

use std::fmt;

use crate::policy::slru::{ConcurrentSegmentedLru, EvictionHook, SegmentedLru};
use crate::traits::Value;

/// Builder for byte-budgeted segmented LRU caches.
pub struct CacheBuilder<V> {
    max_bytes: u64,
    on_evicted: Option<EvictionHook<V>>,
}

impl<V: Value> CacheBuilder<V> {
    /// Starts a builder with the given byte budget. `0` means unbounded.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            on_evicted: None,
        }
    }

    /// Registers a callback fired once per evicted entry.
    ///
    /// Replaces any previously registered callback.
    pub fn on_evicted<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&str, &V) + Send + 'static,
    {
        self.on_evicted = Some(Box::new(hook));
        self
    }

    /// Builds a single-threaded engine.
    pub fn build(self) -> SegmentedLru<V> {
        SegmentedLru::from_parts(self.max_bytes, self.on_evicted)
    }

    /// Builds a thread-safe cache. The engine itself is created on first
    /// write; the hook is held until then.
    ///
    /// ```rust
    /// use seglru::builder::CacheBuilder;
    /// use seglru::ByteView;
    ///
    /// let cache = CacheBuilder::<ByteView>::new(1 << 10).build_concurrent();
    /// assert!(!cache.is_initialized());
    /// cache.add("k", ByteView::from("v"));
    /// assert!(cache.is_initialized());
    /// ```
    pub fn build_concurrent(self) -> ConcurrentSegmentedLru<V> {
        ConcurrentSegmentedLru::from_parts(self.max_bytes, self.on_evicted)
    }
}

impl<V> fmt::Debug for CacheBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("max_bytes", &self.max_bytes)
            .field("has_hook", &self.on_evicted.is_some())
            .finish()
    }
}
