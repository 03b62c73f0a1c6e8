//! Consistent key-to-node selection using jump consistent hashing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Node Selection Flow                             │
//! │                                                                         │
//! │   key: "user:42"                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   h = hash(b"user:42")            (FNV-1 64 unless overridden)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   i = jump_hash(h, nodes.len())   i ∈ [0, nodes.len())                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌─────────┬─────────┬─────────┬─────────┐                             │
//! │   │ node-a  │ node-b  │ node-c  │ node-a  │   ◄── duplicates allowed,   │
//! │   └─────────┴─────────┴─────────┴─────────┘       they add weight       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Properties
//!
//! - **Deterministic**: the same key and node list always select the same node.
//! - **Minimal movement**: going from `n` to `n + 1` nodes, a key either keeps
//!   its bucket or moves to the new bucket `n`. With `hash % n` almost every
//!   key would move.
//! - **Append-only**: nodes are never removed. Removing from the middle of
//!   the list would shift every later bucket.
//!
//! ## Example Usage
//!
//! ```
//! use seglru::ds::NodeSelector;
//!
//! let mut nodes = NodeSelector::new();
//! assert_eq!(nodes.get("tom"), None);
//!
//! nodes.add(["node-a", "node-b", "node-c"]);
//! let owner = nodes.get("tom").unwrap();
//! assert_eq!(nodes.get("tom"), Some(owner));
//! ```
//!
//! The reference: Lamping & Veach, "A Fast, Minimal Memory, Consistent Hash
//! Algorithm", 2014.

/// Hash function from raw key bytes to a 64-bit value.
pub type HashFn = fn(&[u8]) -> u64;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const JUMP_MULTIPLIER: u64 = 2_862_933_555_777_941_757;

/// FNV-1 (multiply, then xor) 64-bit hash of `data`.
///
/// Each call starts from the offset basis, so equal inputs always hash equal.
///
/// ```
/// use seglru::ds::fnv1_64;
///
/// assert_eq!(fnv1_64(b""), 0xcbf29ce484222325);
/// assert_eq!(fnv1_64(b"a"), 0xaf63bd4c8601b7be);
/// ```
pub fn fnv1_64(data: &[u8]) -> u64 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        hash.wrapping_mul(FNV_PRIME) ^ u64::from(byte)
    })
}

/// Maps `key` to a bucket in `[0, num_buckets)`.
///
/// The bucket count is clamped to at least 1. The LCG step wraps at 64 bits
/// and the single division is done in `f64`, which keeps results bit-for-bit
/// identical with other implementations of the algorithm.
///
/// ```
/// use seglru::ds::jump_hash;
///
/// assert_eq!(jump_hash(42, 1), 0);
/// assert_eq!(jump_hash(42, 100), 43);
///
/// // Growing by one bucket either keeps the key or moves it to the new one.
/// let before = jump_hash(0xdead_beef, 10);
/// let after = jump_hash(0xdead_beef, 11);
/// assert!(after == before || after == 10);
/// ```
pub fn jump_hash(mut key: u64, num_buckets: usize) -> usize {
    let num_buckets = num_buckets.max(1) as i64;
    let mut bucket: i64 = -1;
    let mut next: i64 = 0;

    while next < num_buckets {
        bucket = next;
        key = key.wrapping_mul(JUMP_MULTIPLIER).wrapping_add(1);
        next = ((bucket + 1) as f64 * ((1i64 << 31) as f64 / ((key >> 33) + 1) as f64)) as i64;
    }

    bucket as usize
}

/// Selects the node that owns a key.
///
/// Node names are kept in insertion order. Listing a name more than once
/// gives it proportionally more of the key space.
///
/// Mutation takes `&mut self`; share a selector across threads behind
/// whatever lock guards the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSelector {
    hash: HashFn,
    nodes: Vec<String>,
}

impl NodeSelector {
    /// Creates an empty selector hashing keys with [`fnv1_64`].
    pub fn new() -> Self {
        Self::with_hash(fnv1_64)
    }

    /// Creates an empty selector with a custom key hash.
    ///
    /// ```
    /// use seglru::ds::NodeSelector;
    ///
    /// // Route every key by its first byte.
    /// let mut nodes = NodeSelector::with_hash(|k| k.first().copied().unwrap_or(0).into());
    /// nodes.add(["only"]);
    /// assert_eq!(nodes.get("anything"), Some("only"));
    /// ```
    pub fn with_hash(hash: HashFn) -> Self {
        Self {
            hash,
            nodes: Vec::new(),
        }
    }

    /// Appends node names in iteration order. No validation, no dedup.
    pub fn add<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes.extend(names.into_iter().map(Into::into));
    }

    /// Returns the node owning `key`, or `None` if no nodes were added.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.nodes.is_empty() {
            return None;
        }
        let bucket = jump_hash((self.hash)(key.as_bytes()), self.nodes.len());
        self.nodes.get(bucket).map(String::as_str)
    }

    /// Node names in insertion order, duplicates included.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for NodeSelector {
    fn default() -> Self {
        Self::new()
    }
}
