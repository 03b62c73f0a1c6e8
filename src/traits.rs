//! # Value Capability
//!
//! The eviction engine never looks inside what it stores. Everything it needs
//! to know about a value is its encoded size in bytes, which feeds the byte
//! budget:
//!
//! ```text
//!   charge(entry) = key.len() + ENTRY_OVERHEAD + value.len()
//!                   ─────────   ──────────────   ───────────
//!                   UTF-8 bytes  fixed (2)       Value::len
//! ```
//!
//! ## Implementors
//!
//! | Type               | `len()`                    |
//! |--------------------|----------------------------|
//! | `ByteView`         | payload bytes              |
//! | `Vec<u8>`          | `Vec::len`                 |
//! | `Box<[u8]>`        | slice length               |
//! | `Arc<[u8]>`        | slice length               |
//! | `String`           | UTF-8 byte length          |
//! | `&'static str`     | UTF-8 byte length          |
//!
//! A type without a size cannot be stored at all: the bound is checked at
//! compile time, so there is no runtime "missing capability" path.
//!
//! ## Example
//!
//! ```
//! use seglru::traits::Value;
//! use seglru::policy::slru::SegmentedLru;
//!
//! struct Page {
//!     body: Vec<u8>,
//! }
//!
//! impl Value for Page {
//!     fn len(&self) -> usize {
//!         self.body.len()
//!     }
//! }
//!
//! let mut cache = SegmentedLru::new(0);
//! cache.put("index.html", Page { body: vec![0; 16] });
//! assert_eq!(cache.total_bytes(), "index.html".len() as u64 + 2 + 16);
//! ```

use std::sync::Arc;

/// Anything the cache can store: reports its encoded size in bytes.
pub trait Value {
    /// Encoded size in bytes, used for all capacity accounting.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Value for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl Value for Box<[u8]> {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }
}

impl Value for Arc<[u8]> {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }
}

impl Value for String {
    fn len(&self) -> usize {
        String::len(self)
    }
}

impl Value for &'static str {
    fn len(&self) -> usize {
        str::len(self)
    }
}
