//! Byte-budgeted segmented LRU with a two-touch admission rule.
//!
//! New entries land in a **probationary** segment. The first re-access only
//! refreshes an entry's position there and marks it `visited`; the second
//! re-access promotes it to the **protected** segment. A one-pass scan
//! therefore churns through probationary and never reaches the entries that
//! have proven themselves.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          SegmentedLru<V> Layout                             │
//! │                                                                             │
//! │   index: FxHashMap<String, SlotId>     arena: SlotArena<Entry<V>>           │
//! │   ┌──────────┬──────────┐              ┌─────┬───────────────────────────┐  │
//! │   │   Key    │  SlotId  │              │ Idx │ key, value, seg, visited  │  │
//! │   ├──────────┼──────────┤              ├─────┼───────────────────────────┤  │
//! │   │  "tom"   │   id(0)  │─────────────►│  0  │ tom, 630, Prob, false     │  │
//! │   │  "jack"  │   id(1)  │─────────────►│  1  │ jack, 390, Prot, true     │  │
//! │   │  "ice"   │   id(2)  │─────────────►│  2  │ ice, 439, Prob, true      │  │
//! │   └──────────┴──────────┘              └─────┴───────────────────────────┘  │
//! │                                                                             │
//! │   PROBATIONARY (ListHead)                 PROTECTED (ListHead)              │
//! │   MRU ─► [ice] ◄──► [tom] ◄── LRU         MRU ─► [jack] ◄── LRU             │
//! │                       ▲                                                     │
//! │                       └── evicted first                                     │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both segments thread through the same arena, so promotion and demotion
//! relink a slot without moving it or touching the index.
//!
//! ## Access Flow
//!
//! ```text
//!   get(key) / put(existing key):
//!     Protected                 → move to protected MRU
//!     Probationary, !visited    → move to probationary MRU, visited = true
//!     Probationary,  visited    → unlink, push to protected MRU
//! ```
//!
//! ## Put Flow
//!
//! ```text
//!   put(key, value):
//!     1. overwrite in place (+ access rule above), or admit at probationary MRU
//!     2. rebalance: while protected.len > floor(len * 0.625)
//!                     demote protected LRU → probationary MRU
//!     3. while max_bytes != 0 && total_bytes > max_bytes
//!                     evict probationary LRU, else protected LRU
//!     4. rebalance again if anything was evicted
//! ```
//!
//! Every entry is charged `key.len() + 2 + value.len()` bytes.
//!
//! ## Operations
//!
//! | Operation   | Time   | Notes                                         |
//! |-------------|--------|-----------------------------------------------|
//! | `get`       | O(1)   | May mark visited or promote                   |
//! | `put`       | O(1)*  | *Amortized; may demote and evict              |
//! | `peek`      | O(1)   | No admission side effects                     |
//! | `len`       | O(1)   | Number of entries                             |
//! | `clear`     | O(n)   | Does not fire the eviction hook               |
//!
//! ## Thread Safety
//!
//! - [`SegmentedLru`]: Not thread-safe; mutations take `&mut self`.
//! - [`ConcurrentSegmentedLru`]: One `parking_lot::Mutex` around a lazily
//!   built engine. `get` mutates admission state, so there is no read path
//!   that could share the lock.
//!
//! The eviction hook runs inside the critical section. A hook that calls back
//! into the same `ConcurrentSegmentedLru` deadlocks.
//!
//! ## Example Usage
//!
//! ```
//! use seglru::policy::slru::{Segment, SegmentedLru};
//!
//! let mut cache = SegmentedLru::new(0);
//! cache.put("tom", String::from("630"));
//!
//! cache.get("tom"); // first touch: stays probationary
//! assert_eq!(cache.segment_of("tom"), Some(Segment::Probationary));
//!
//! cache.get("tom"); // second touch: promoted
//! assert_eq!(cache.segment_of("tom"), Some(Segment::Protected));
//! ```

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{error, trace};

use crate::ds::intrusive_list::{Linked, Links, ListHead};
use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;
use crate::traits::Value;

/// Largest share of entries the protected segment may hold after a `put`.
pub const PROTECTED_RATIO: f64 = 0.625;

/// Fixed bytes charged per entry on top of key and value length.
pub const ENTRY_OVERHEAD: u64 = 2;

/// Callback fired once per evicted entry, after it has left the cache.
pub type EvictionHook<V> = Box<dyn FnMut(&str, &V) + Send>;

/// Which segment an entry lives in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Segment {
    /// Admitted but not yet re-accessed twice. Evicted first.
    Probationary,
    /// Re-accessed at least twice since admission (or since demotion).
    Protected,
}

struct Entry<V> {
    links: Links,
    segment: Segment,
    visited: bool,
    key: String,
    value: V,
}

impl<V> Linked for Entry<V> {
    fn links(&self) -> &Links {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

#[inline]
fn charge<V: Value>(key: &str, value: &V) -> u64 {
    key.len() as u64 + ENTRY_OVERHEAD + value.len() as u64
}

#[inline]
fn protected_cap(entries: usize) -> usize {
    (entries as f64 * PROTECTED_RATIO) as usize
}

/// Segmented LRU cache bounded by total bytes.
///
/// `max_bytes == 0` disables eviction entirely.
///
/// # Example
///
/// ```
/// use seglru::policy::slru::SegmentedLru;
///
/// // Room for exactly two entries of 1-byte key + 1-byte value.
/// let mut cache = SegmentedLru::new(8);
/// cache.put("a", "1");
/// cache.put("b", "2");
/// cache.put("c", "3");
///
/// assert!(!cache.contains("a"));
/// assert_eq!(cache.len(), 2);
/// assert_eq!(cache.total_bytes(), 8);
/// ```
pub struct SegmentedLru<V> {
    index: FxHashMap<String, SlotId>,
    arena: SlotArena<Entry<V>>,
    probationary: ListHead,
    protected: ListHead,
    total_bytes: u64,
    max_bytes: u64,
    on_evicted: Option<EvictionHook<V>>,
}

impl<V: Value> SegmentedLru<V> {
    /// Creates an engine with a byte budget and no eviction hook.
    pub fn new(max_bytes: u64) -> Self {
        Self::from_parts(max_bytes, None)
    }

    /// Creates an engine that reports every eviction to `hook`.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use parking_lot::Mutex;
    /// use seglru::policy::slru::SegmentedLru;
    ///
    /// let evicted = Arc::new(Mutex::new(Vec::new()));
    /// let sink = Arc::clone(&evicted);
    /// let mut cache = SegmentedLru::with_eviction_hook(8, move |key: &str, _: &&str| {
    ///     sink.lock().push(key.to_string());
    /// });
    ///
    /// cache.put("a", "1");
    /// cache.put("b", "2");
    /// cache.put("c", "3");
    /// assert_eq!(*evicted.lock(), vec!["a".to_string()]);
    /// ```
    pub fn with_eviction_hook<F>(max_bytes: u64, hook: F) -> Self
    where
        F: FnMut(&str, &V) + Send + 'static,
    {
        Self::from_parts(max_bytes, Some(Box::new(hook)))
    }

    pub(crate) fn from_parts(max_bytes: u64, on_evicted: Option<EvictionHook<V>>) -> Self {
        Self {
            index: FxHashMap::default(),
            arena: SlotArena::new(),
            probationary: ListHead::new(),
            protected: ListHead::new(),
            total_bytes: 0,
            max_bytes,
            on_evicted,
        }
    }

    /// Looks up `key` and applies the admission rule.
    ///
    /// A probationary entry seen for the first time is refreshed and marked
    /// visited; seen a second time, it moves to protected. A protected entry
    /// is refreshed. Misses have no side effects.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.touch(id);
        self.arena.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key` without touching recency or admission state.
    pub fn peek(&self, key: &str) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.arena.get(id).map(|entry| &entry.value)
    }

    /// Inserts or overwrites `key`, then rebalances and evicts to budget.
    ///
    /// An overwrite counts as an access: it follows the same admission rule
    /// as [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Panics if the cache is over budget with both segments empty. That can
    /// only happen if byte accounting has drifted from the stored entries.
    ///
    /// Rebalancing runs a second time after any eviction, a step beyond the
    /// classic rebalance-then-evict order, so the protected share still
    /// holds once eviction has shrunk the entry count.
    pub fn put(&mut self, key: &str, value: V) {
        match self.index.get(key).copied() {
            Some(id) => {
                let entry = self.arena.get_mut(id).expect("index/arena out of sync");
                let old = std::mem::replace(&mut entry.value, value);
                let new_len = entry.value.len() as u64;
                self.total_bytes = self.total_bytes - old.len() as u64 + new_len;
                self.touch(id);
            },
            None => {
                let bytes = charge(key, &value);
                let id = self.arena.insert(Entry {
                    links: Links::default(),
                    segment: Segment::Probationary,
                    visited: false,
                    key: key.to_owned(),
                    value,
                });
                self.probationary.push_front(&mut self.arena, id);
                self.index.insert(key.to_owned(), id);
                self.total_bytes += bytes;
            },
        }

        self.rebalance();
        if self.evict_to_budget() > 0 {
            self.rebalance();
        }
    }

    /// Number of entries across both segments.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns `true` if `key` is cached. No admission side effects.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Bytes currently charged against the budget.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Configured budget; `0` means unbounded.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn probationary_len(&self) -> usize {
        self.probationary.len()
    }

    pub fn protected_len(&self) -> usize {
        self.protected.len()
    }

    /// Segment currently holding `key`.
    pub fn segment_of(&self, key: &str) -> Option<Segment> {
        let id = *self.index.get(key)?;
        self.arena.get(id).map(|entry| entry.segment)
    }

    /// Keys of one segment from most- to least-recently used.
    pub fn keys(&self, segment: Segment) -> impl Iterator<Item = &str> + '_ {
        let list = match segment {
            Segment::Probationary => &self.probationary,
            Segment::Protected => &self.protected,
        };
        list.iter(&self.arena).map(|(_, entry)| entry.key.as_str())
    }

    /// Drops every entry without firing the eviction hook.
    pub fn clear(&mut self) {
        self.index.clear();
        self.arena.clear();
        self.probationary.clear();
        self.protected.clear();
        self.total_bytes = 0;
    }

    fn touch(&mut self, id: SlotId) {
        let (segment, visited) = match self.arena.get(id) {
            Some(entry) => (entry.segment, entry.visited),
            None => return,
        };

        match (segment, visited) {
            (Segment::Protected, _) => {
                self.protected.move_to_front(&mut self.arena, id);
            },
            (Segment::Probationary, true) => {
                self.probationary.unlink(&mut self.arena, id);
                self.protected.push_front(&mut self.arena, id);
                if let Some(entry) = self.arena.get_mut(id) {
                    entry.segment = Segment::Protected;
                }
            },
            (Segment::Probationary, false) => {
                self.probationary.move_to_front(&mut self.arena, id);
                if let Some(entry) = self.arena.get_mut(id) {
                    entry.visited = true;
                }
            },
        }
    }

    /// Demotes protected LRU entries until protected fits its share.
    ///
    /// Demoted entries keep their `visited` flag.
    fn rebalance(&mut self) {
        let cap = protected_cap(self.len());
        let mut demoted = 0usize;
        while self.protected.len() > cap {
            let Some(id) = self.protected.pop_back(&mut self.arena) else {
                break;
            };
            self.probationary.push_front(&mut self.arena, id);
            if let Some(entry) = self.arena.get_mut(id) {
                entry.segment = Segment::Probationary;
            }
            demoted += 1;
        }
        if demoted > 0 {
            trace!(demoted, protected = self.protected.len(), "demoted to probationary");
        }
    }

    /// Evicts LRU entries, probationary first, until within budget.
    fn evict_to_budget(&mut self) -> usize {
        let mut evicted = 0usize;
        while self.max_bytes != 0 && self.total_bytes > self.max_bytes {
            let victim = match self.probationary.pop_back(&mut self.arena) {
                Some(id) => Some(id),
                None => self.protected.pop_back(&mut self.arena),
            };
            let Some(id) = victim else {
                error!(
                    total_bytes = self.total_bytes,
                    max_bytes = self.max_bytes,
                    "over budget with both segments empty"
                );
                panic!(
                    "byte accounting corrupted: {} bytes charged against a budget of {} with no entries left",
                    self.total_bytes, self.max_bytes
                );
            };

            let entry = self.arena.remove(id).expect("linked slot missing from arena");
            self.index.remove(entry.key.as_str());
            let bytes = charge(&entry.key, &entry.value);
            self.total_bytes = self.total_bytes.saturating_sub(bytes);
            evicted += 1;
            trace!(key = %entry.key, bytes, segment = ?entry.segment, "evicted");

            if let Some(hook) = self.on_evicted.as_mut() {
                hook(&entry.key, &entry.value);
            }
        }
        evicted
    }

    /// Checks structural and accounting invariants.
    ///
    /// - every listed entry carries its list's segment tag, and back links agree
    /// - list lengths add up to the index, and the index to the arena
    /// - every key maps to an entry with that key
    /// - `total_bytes` equals the sum of entry charges and respects the budget
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut charged = 0u64;
        for (name, list, segment) in [
            ("probationary", &self.probationary, Segment::Probationary),
            ("protected", &self.protected, Segment::Protected),
        ] {
            let mut count = 0usize;
            let mut prev: Option<SlotId> = None;
            for (id, entry) in list.iter(&self.arena) {
                count += 1;
                if count > self.arena.len() {
                    return Err(InvariantError::new(format!("{name}: cycle detected")));
                }
                if entry.segment != segment {
                    return Err(InvariantError::new(format!(
                        "{name}: entry {:?} tagged {:?}",
                        entry.key, entry.segment
                    )));
                }
                if entry.links.prev() != prev {
                    return Err(InvariantError::new(format!(
                        "{name}: entry {:?} prev link inconsistent",
                        entry.key
                    )));
                }
                if self.index.get(entry.key.as_str()) != Some(&id) {
                    return Err(InvariantError::new(format!(
                        "{name}: entry {:?} not indexed at {:?}",
                        entry.key, id
                    )));
                }
                charged += charge(&entry.key, &entry.value);
                prev = Some(id);
            }
            if count != list.len() {
                return Err(InvariantError::new(format!(
                    "{name}: counted {count} but len = {}",
                    list.len()
                )));
            }
            if list.back() != prev {
                return Err(InvariantError::new(format!("{name}: tail mismatch")));
            }
        }

        let listed = self.probationary.len() + self.protected.len();
        if listed != self.index.len() || self.index.len() != self.arena.len() {
            return Err(InvariantError::new(format!(
                "listed {listed}, indexed {}, stored {}",
                self.index.len(),
                self.arena.len()
            )));
        }
        if charged != self.total_bytes {
            return Err(InvariantError::new(format!(
                "total_bytes {} but entries charge {charged}",
                self.total_bytes
            )));
        }
        if self.max_bytes != 0 && self.total_bytes > self.max_bytes {
            return Err(InvariantError::new(format!(
                "total_bytes {} over budget {}",
                self.total_bytes, self.max_bytes
            )));
        }
        Ok(())
    }

    /// Walks both lists and panics on the first broken invariant. O(n).
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.probationary.debug_validate_invariants(&self.arena);
        self.protected.debug_validate_invariants(&self.arena);
        if let Err(err) = self.check_invariants() {
            panic!("{err}");
        }
    }
}

impl<V> fmt::Debug for SegmentedLru<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentedLru")
            .field("len", &self.index.len())
            .field("probationary_len", &self.probationary.len())
            .field("protected_len", &self.protected.len())
            .field("total_bytes", &self.total_bytes)
            .field("max_bytes", &self.max_bytes)
            .field("has_hook", &self.on_evicted.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Concurrent wrapper
// ---------------------------------------------------------------------------

struct LazyEngine<V> {
    engine: Option<SegmentedLru<V>>,
    hook: Option<EvictionHook<V>>,
}

/// Thread-safe [`SegmentedLru`] behind a single exclusive lock.
///
/// The engine is built on the first [`add`](Self::add). Reads before that
/// return `None` without allocating.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use seglru::policy::slru::ConcurrentSegmentedLru;
///
/// let cache = Arc::new(ConcurrentSegmentedLru::new(1 << 10));
/// assert!(!cache.is_initialized());
///
/// let writer = Arc::clone(&cache);
/// thread::spawn(move || writer.add("tom", String::from("630")))
///     .join()
///     .unwrap();
///
/// assert_eq!(cache.get("tom"), Some(String::from("630")));
/// assert!(cache.is_initialized());
/// ```
pub struct ConcurrentSegmentedLru<V> {
    inner: Mutex<LazyEngine<V>>,
    max_bytes: u64,
}

impl<V: Value> ConcurrentSegmentedLru<V> {
    /// Creates an empty cache; the engine is built on first write.
    pub fn new(max_bytes: u64) -> Self {
        Self::from_parts(max_bytes, None)
    }

    pub(crate) fn from_parts(max_bytes: u64, hook: Option<EvictionHook<V>>) -> Self {
        Self {
            inner: Mutex::new(LazyEngine { engine: None, hook }),
            max_bytes,
        }
    }

    /// Inserts or overwrites `key` under the lock.
    pub fn add(&self, key: &str, value: V) {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        if state.engine.is_none() {
            trace!(max_bytes = self.max_bytes, "building engine on first write");
            state.engine = Some(SegmentedLru::from_parts(self.max_bytes, state.hook.take()));
        }
        if let Some(engine) = state.engine.as_mut() {
            engine.put(key, value);
        }
    }

    /// Looks up `key` under the lock and clones the value out.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Looks up `key` under the lock and maps the value with `f`.
    ///
    /// `f` runs while the lock is held.
    pub fn get_with<R>(&self, key: &str, f: impl FnOnce(&V) -> R) -> Option<R> {
        let mut guard = self.inner.lock();
        let engine = guard.engine.as_mut()?;
        engine.get(key).map(f)
    }

    /// Number of entries; `0` before the first write.
    pub fn len(&self) -> usize {
        self.inner.lock().engine.as_ref().map_or(0, SegmentedLru::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes charged against the budget; `0` before the first write.
    pub fn total_bytes(&self) -> u64 {
        self.inner
            .lock()
            .engine
            .as_ref()
            .map_or(0, SegmentedLru::total_bytes)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Returns `true` once the first write has built the engine.
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().engine.is_some()
    }

    /// Runs `f` against the engine, if built, while holding the lock.
    pub fn with_engine<R>(&self, f: impl FnOnce(&SegmentedLru<V>) -> R) -> Option<R> {
        self.inner.lock().engine.as_ref().map(f)
    }
}

impl<V: Value> Default for ConcurrentSegmentedLru<V> {
    /// Unbounded cache.
    fn default() -> Self {
        Self::new(0)
    }
}

impl<V> fmt::Debug for ConcurrentSegmentedLru<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        f.debug_struct("ConcurrentSegmentedLru")
            .field("max_bytes", &self.max_bytes)
            .field("engine", &guard.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// 1-byte key + 1-byte value.
    const SMALL: u64 = 4;

    fn keys(cache: &SegmentedLru<&'static str>, segment: Segment) -> Vec<String> {
        cache.keys(segment).map(str::to_owned).collect()
    }

    // ==============================================
    // Basic Operations
    // ==============================================

    mod basic_operations {
        use super::*;

        #[test]
        fn new_cache_is_empty() {
            let cache: SegmentedLru<String> = SegmentedLru::new(100);
            assert!(cache.is_empty());
            assert_eq!(cache.len(), 0);
            assert_eq!(cache.total_bytes(), 0);
            assert_eq!(cache.max_bytes(), 100);
        }

        #[test]
        fn put_then_get() {
            let mut cache = SegmentedLru::new(0);
            cache.put("key1", "value1");
            assert_eq!(cache.len(), 1);
            assert_eq!(cache.get("key1"), Some(&"value1"));
        }

        #[test]
        fn get_missing_key_has_no_side_effects() {
            let mut cache = SegmentedLru::new(0);
            cache.put("exists", "v");
            assert_eq!(cache.get("missing"), None);
            assert_eq!(cache.len(), 1);
            assert_eq!(cache.segment_of("exists"), Some(Segment::Probationary));
            assert_eq!(cache.peek("missing"), None);
        }

        #[test]
        fn charges_key_overhead_and_value() {
            let mut cache = SegmentedLru::new(0);
            cache.put("abc", String::from("12345"));
            assert_eq!(cache.total_bytes(), 3 + ENTRY_OVERHEAD + 5);
        }

        #[test]
        fn unbounded_never_evicts() {
            let mut cache = SegmentedLru::new(0);
            cache.put("a", String::from("aaaa"));
            cache.put("b", String::from("bbbb"));
            assert_eq!(cache.len(), 2);
            assert_eq!(cache.total_bytes(), 14);

            for i in 0..1_000 {
                cache.put(&format!("k{i}"), format!("{i:0>64}"));
            }
            assert_eq!(cache.len(), 1_002);
            cache.check_invariants().unwrap();
        }

        #[test]
        fn peek_does_not_touch() {
            let mut cache = SegmentedLru::new(0);
            cache.put("a", "1");
            assert_eq!(cache.peek("a"), Some(&"1"));
            assert_eq!(cache.peek("a"), Some(&"1"));
            assert_eq!(cache.segment_of("a"), Some(Segment::Probationary));
            // Still unvisited: two gets are needed to promote.
            cache.get("a");
            assert_eq!(cache.segment_of("a"), Some(Segment::Probationary));
        }

        #[test]
        fn clear_resets_everything() {
            let mut cache = SegmentedLru::new(0);
            cache.put("a", "1");
            cache.put("b", "2");
            cache.get("a");
            cache.get("a");

            cache.clear();
            assert!(cache.is_empty());
            assert_eq!(cache.total_bytes(), 0);
            assert_eq!(cache.protected_len(), 0);
            assert!(!cache.contains("a"));
            cache.check_invariants().unwrap();

            cache.put("c", "3");
            assert_eq!(cache.len(), 1);
        }
    }

    // ==============================================
    // Admission (two touches to protected)
    // ==============================================

    mod admission {
        use super::*;

        #[test]
        fn first_read_marks_second_read_promotes() {
            let mut cache = SegmentedLru::new(0);
            cache.put("k", "v");
            assert_eq!(cache.segment_of("k"), Some(Segment::Probationary));

            assert_eq!(cache.get("k"), Some(&"v"));
            assert_eq!(cache.segment_of("k"), Some(Segment::Probationary));

            assert_eq!(cache.get("k"), Some(&"v"));
            assert_eq!(cache.segment_of("k"), Some(Segment::Protected));
            assert_eq!(cache.protected_len(), 1);
            assert_eq!(cache.probationary_len(), 0);
        }

        #[test]
        fn third_read_refreshes_protected_position() {
            let mut cache = SegmentedLru::new(0);
            cache.put("x", "1");
            cache.get("x");
            cache.get("x");
            cache.put("k", "2");
            cache.get("k");
            cache.get("k");
            assert_eq!(keys(&cache, Segment::Protected), vec!["k", "x"]);

            cache.get("x");
            assert_eq!(keys(&cache, Segment::Protected), vec!["x", "k"]);

            cache.get("k");
            assert_eq!(keys(&cache, Segment::Protected), vec!["k", "x"]);
            assert_eq!(cache.segment_of("k"), Some(Segment::Protected));
        }

        #[test]
        fn first_read_moves_to_probationary_front() {
            let mut cache = SegmentedLru::new(0);
            cache.put("a", "1");
            cache.put("b", "2");
            cache.put("c", "3");
            assert_eq!(keys(&cache, Segment::Probationary), vec!["c", "b", "a"]);

            cache.get("a");
            assert_eq!(keys(&cache, Segment::Probationary), vec!["a", "c", "b"]);
        }

        #[test]
        fn overwrite_counts_as_access() {
            let mut cache = SegmentedLru::new(0);
            for key in ["a", "b", "c", "d", "e"] {
                cache.put(key, String::from("v"));
            }

            cache.put("a", String::from("v2"));
            assert_eq!(cache.segment_of("a"), Some(Segment::Probationary));
            assert_eq!(cache.keys(Segment::Probationary).next(), Some("a"));

            cache.put("a", String::from("v33"));
            assert_eq!(cache.segment_of("a"), Some(Segment::Protected));
            assert_eq!(cache.peek("a").map(String::as_str), Some("v33"));
        }

        #[test]
        fn overwrite_adjusts_bytes_by_delta() {
            let mut cache = SegmentedLru::new(0);
            cache.put("key", String::from("12"));
            assert_eq!(cache.total_bytes(), 3 + 2 + 2);

            cache.put("key", String::from("123456"));
            assert_eq!(cache.total_bytes(), 3 + 2 + 6);

            cache.put("key", String::new());
            assert_eq!(cache.total_bytes(), 3 + 2);
            assert_eq!(cache.len(), 1);
            cache.check_invariants().unwrap();
        }

        #[test]
        fn scan_does_not_reach_protected() {
            let mut cache = SegmentedLru::new(0);
            cache.put("hot", "h");
            cache.get("hot");
            cache.get("hot");

            for i in 0..50 {
                let key = format!("scan{i}");
                cache.put(&key, "s");
                cache.get(&key);
            }

            assert_eq!(keys(&cache, Segment::Protected), vec!["hot"]);
        }
    }

    // ==============================================
    // Eviction Behavior
    // ==============================================

    mod eviction_behavior {
        use super::*;

        #[test]
        fn third_small_entry_evicts_one() {
            let mut cache = SegmentedLru::new(2 * SMALL);
            cache.put("a", "1");
            cache.put("b", "2");
            assert_eq!(cache.total_bytes(), 2 * SMALL);

            cache.put("c", "3");
            assert_eq!(cache.len(), 2);
            assert!(!cache.contains("a"));
            assert!(cache.total_bytes() <= 2 * SMALL);
        }

        #[test]
        fn evicts_least_recently_touched_probationary() {
            let mut cache = SegmentedLru::new(3 * SMALL);
            cache.put("a", "1");
            cache.put("b", "2");
            cache.put("c", "3");
            cache.get("a");

            cache.put("d", "4");
            assert!(!cache.contains("b"));
            assert!(cache.contains("a"));
            assert!(cache.contains("c"));
            assert!(cache.contains("d"));
        }

        #[test]
        fn protected_outlives_probationary() {
            let mut cache = SegmentedLru::new(3 * SMALL);
            cache.put("a", "1");
            cache.get("a");
            cache.get("a");
            cache.put("b", "2");
            cache.put("c", "3");

            cache.put("d", "4");
            assert!(!cache.contains("b"));
            cache.put("e", "5");
            assert!(!cache.contains("c"));

            assert_eq!(cache.segment_of("a"), Some(Segment::Protected));
        }

        #[test]
        fn protected_evicted_once_probationary_is_empty() {
            let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
            let sink = Arc::clone(&order);
            let mut cache = SegmentedLru::with_eviction_hook(4 * SMALL, move |k: &str, _: &&str| {
                sink.lock().push(k.to_string());
            });
            for key in ["a", "b", "c", "d"] {
                cache.put(key, "v");
            }
            for key in ["a", "b"] {
                cache.get(key);
                cache.get(key);
            }
            assert_eq!(cache.protected_len(), 2);

            // Growing "b" past the whole budget drains probationary, then
            // protected from its LRU end.
            cache.put("b", "too-large-for-budget");
            assert!(cache.is_empty());
            assert_eq!(cache.total_bytes(), 0);
            assert_eq!(*order.lock(), vec!["c", "d", "a", "b"]);
        }

        #[test]
        fn oversized_entry_evicts_itself_last() {
            let mut cache = SegmentedLru::new(3 * SMALL);
            cache.put("a", "1");
            cache.put("b", "2");
            cache.put("big", "0123456789");

            assert!(cache.is_empty());
            assert_eq!(cache.total_bytes(), 0);
            cache.check_invariants().unwrap();
        }

        #[test]
        fn growing_an_entry_can_evict_others() {
            let mut cache = SegmentedLru::new(3 * SMALL);
            cache.put("a", "1");
            cache.put("b", "2");
            cache.put("c", "3");

            cache.put("c", "3333");
            assert_eq!(cache.len(), 2);
            assert!(!cache.contains("a"));
            assert_eq!(cache.total_bytes(), SMALL + SMALL + 3);
        }

        #[test]
        #[should_panic(expected = "byte accounting corrupted")]
        fn drifted_accounting_is_fatal() {
            let mut cache: SegmentedLru<&'static str> = SegmentedLru::new(SMALL);
            cache.total_bytes = 100;
            cache.evict_to_budget();
        }
    }

    // ==============================================
    // Rebalance (protected share cap)
    // ==============================================

    mod rebalance {
        use super::*;

        #[test]
        fn cap_is_floor_of_ratio() {
            assert_eq!(protected_cap(0), 0);
            assert_eq!(protected_cap(1), 0);
            assert_eq!(protected_cap(2), 1);
            assert_eq!(protected_cap(4), 2);
            assert_eq!(protected_cap(8), 5);
            assert_eq!(protected_cap(100), 62);
        }

        #[test]
        fn demotes_protected_lru_to_probationary_front() {
            let mut cache = SegmentedLru::new(0);
            for key in ["a", "b", "c", "d"] {
                cache.put(key, "v");
            }
            for key in ["a", "b", "c"] {
                cache.get(key);
                cache.get(key);
            }
            assert_eq!(keys(&cache, Segment::Protected), vec!["c", "b", "a"]);

            // 4 entries cap protected at 2; "a" is its LRU.
            cache.put("d", "v2");
            assert_eq!(keys(&cache, Segment::Protected), vec!["c", "b"]);
            assert_eq!(keys(&cache, Segment::Probationary), vec!["a", "d"]);
        }

        #[test]
        fn demoted_entry_keeps_visited_flag() {
            let mut cache = SegmentedLru::new(0);
            for key in ["a", "b", "c", "d"] {
                cache.put(key, "v");
            }
            for key in ["a", "b", "c"] {
                cache.get(key);
                cache.get(key);
            }
            cache.put("d", "v2");
            assert_eq!(cache.segment_of("a"), Some(Segment::Probationary));

            // One touch is enough to come back.
            cache.get("a");
            assert_eq!(cache.segment_of("a"), Some(Segment::Protected));
        }

        #[test]
        fn ratio_holds_after_eviction() {
            let mut cache = SegmentedLru::new(8 * SMALL);
            for i in 0..8u8 {
                let key = char::from(b'a' + i).to_string();
                cache.put(&key, "v");
                cache.get(&key);
                cache.get(&key);
            }
            for i in 0..8u8 {
                let key = char::from(b'A' + i).to_string();
                cache.put(&key, "v");
                assert!(cache.protected_len() <= protected_cap(cache.len()));
            }
            cache.check_invariants().unwrap();
        }

        #[test]
        fn single_entry_cannot_stay_protected_across_put() {
            let mut cache = SegmentedLru::new(0);
            cache.put("a", "1");
            cache.get("a");
            cache.get("a");
            assert_eq!(cache.segment_of("a"), Some(Segment::Protected));

            cache.put("a", "2");
            assert_eq!(cache.segment_of("a"), Some(Segment::Probationary));
        }
    }

    // ==============================================
    // Eviction Hook
    // ==============================================

    mod eviction_hook {
        use super::*;
        use parking_lot::Mutex;

        type Log = Arc<Mutex<Vec<(String, String)>>>;

        fn recording(max_bytes: u64) -> (SegmentedLru<String>, Log) {
            let log: Log = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&log);
            let cache = SegmentedLru::with_eviction_hook(max_bytes, move |k: &str, v: &String| {
                sink.lock().push((k.to_string(), v.clone()));
            });
            (cache, log)
        }

        #[test]
        fn receives_key_and_last_value() {
            let (mut cache, log) = recording(2 * SMALL);
            cache.put("a", String::from("1"));
            cache.put("a", String::from("2"));
            cache.put("b", String::from("x"));
            cache.put("c", String::from("y"));

            assert_eq!(*log.lock(), vec![("a".to_string(), "2".to_string())]);
            assert_eq!(cache.total_bytes(), 2 * SMALL);
        }

        #[test]
        fn fires_once_per_eviction() {
            let (mut cache, log) = recording(60);
            for i in 0..100 {
                cache.put(&format!("{i:03}"), String::from("v"));
            }

            assert_eq!(cache.len(), 10);
            let log = log.lock();
            assert_eq!(log.len(), 90);
            let mut evicted: Vec<_> = log.iter().map(|(k, _)| k.clone()).collect();
            evicted.sort();
            evicted.dedup();
            assert_eq!(evicted.len(), 90);
            for key in &evicted {
                assert!(!cache.contains(key));
            }
        }

        #[test]
        fn clear_is_silent() {
            let (mut cache, log) = recording(0);
            cache.put("a", String::from("1"));
            cache.clear();
            assert!(log.lock().is_empty());
        }
    }

    // ==============================================
    // Concurrent Wrapper
    // ==============================================

    mod concurrent {
        use super::*;
        use parking_lot::Mutex;

        #[test]
        fn read_before_write_does_not_build_engine() {
            let cache: ConcurrentSegmentedLru<String> = ConcurrentSegmentedLru::new(64);
            assert_eq!(cache.get("missing"), None);
            assert!(!cache.is_initialized());
            assert_eq!(cache.len(), 0);
            assert_eq!(cache.total_bytes(), 0);
            assert!(cache.with_engine(|e| e.len()).is_none());
        }

        #[test]
        fn first_add_builds_engine_with_budget() {
            let cache = ConcurrentSegmentedLru::new(2 * SMALL);
            cache.add("a", "1");
            assert!(cache.is_initialized());
            assert_eq!(cache.with_engine(|e| e.max_bytes()), Some(2 * SMALL));

            cache.add("b", "2");
            cache.add("c", "3");
            assert_eq!(cache.len(), 2);
            assert_eq!(cache.get("a"), None);
            assert_eq!(cache.get("c"), Some("3"));
        }

        #[test]
        fn get_applies_admission_rule() {
            let cache = ConcurrentSegmentedLru::new(0);
            cache.add("k", String::from("v"));
            cache.get("k");
            cache.get("k");
            assert_eq!(
                cache.with_engine(|e| e.segment_of("k")),
                Some(Some(Segment::Protected))
            );
        }

        #[test]
        fn get_with_maps_under_lock() {
            let cache = ConcurrentSegmentedLru::new(0);
            cache.add("k", vec![1u8, 2, 3]);
            assert_eq!(cache.get_with("k", |v| v.len()), Some(3));
            assert_eq!(cache.get_with("nope", |v| v.len()), None);
        }

        #[test]
        fn deferred_hook_is_carried_into_engine() {
            let count = Arc::new(Mutex::new(0usize));
            let sink = Arc::clone(&count);
            let hook: EvictionHook<&'static str> = Box::new(move |_: &str, _: &&'static str| *sink.lock() += 1);
            let cache = ConcurrentSegmentedLru::from_parts(SMALL, Some(hook));

            cache.add("a", "1");
            cache.add("b", "2");
            assert_eq!(*count.lock(), 1);
        }

        #[test]
        fn is_send_and_sync() {
            fn assert_send_sync<T: Send + Sync>() {}
            assert_send_sync::<ConcurrentSegmentedLru<String>>();
        }
    }

    // ==============================================
    // Regression Tests
    // ==============================================

    mod regression_tests {
        use super::*;
        use std::time::{Duration, Instant};

        fn fill_time(entries: usize) -> Duration {
            let keys: Vec<String> = (0..entries).map(|i| format!("key-{i:07}")).collect();
            let mut best = Duration::MAX;
            for _ in 0..3 {
                let mut cache = SegmentedLru::new(0);
                let start = Instant::now();
                for key in &keys {
                    cache.put(key, "v");
                }
                best = best.min(start.elapsed());
                assert_eq!(cache.len(), entries);
            }
            best
        }

        #[test]
        fn put_cost_does_not_grow_with_cache_size() {
            // Quadrupling the entry count must not come close to a 16x fill
            // time, which is what a per-put walk of the cache produces.
            let small = fill_time(5_000);
            let large = fill_time(20_000);
            let ratio = large.as_secs_f64() / small.as_secs_f64().max(1e-6);
            assert!(
                ratio < 10.0,
                "fill of 20k took {large:?}, 5k took {small:?} (ratio {ratio:.1})"
            );
        }

        #[test]
        fn bulk_fill_validates_once_at_the_end() {
            let mut cache = SegmentedLru::new(64 * 1024);
            for i in 0..50_000 {
                let key = format!("k{i}");
                cache.put(&key, "value");
                if i % 7 == 0 {
                    cache.get(&key);
                    cache.get(&key);
                }
            }
            cache.debug_validate_invariants();
            assert!(cache.total_bytes() <= 64 * 1024);
        }
    }

    // ==============================================
    // Property Tests
    // ==============================================

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Put(u8, usize),
            Get(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..24, 0usize..24).prop_map(|(k, n)| Op::Put(k, n)),
                (0u8..24).prop_map(Op::Get),
            ]
        }

        proptest! {
            /// Budget, ratio cap and bookkeeping hold after every put.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_put_keeps_invariants(
                max_bytes in 0u64..160,
                ops in prop::collection::vec(op(), 0..300)
            ) {
                let mut cache = SegmentedLru::new(max_bytes);
                for op in ops {
                    match op {
                        Op::Put(k, n) => {
                            cache.put(&format!("k{k}"), "x".repeat(n));
                            if max_bytes != 0 {
                                prop_assert!(cache.total_bytes() <= max_bytes);
                            }
                            prop_assert!(cache.protected_len() <= protected_cap(cache.len()));
                        },
                        Op::Get(k) => {
                            cache.get(&format!("k{k}"));
                        },
                    }
                    prop_assert!(cache.check_invariants().is_ok());
                }
            }

            /// Evicted keys are reported exactly once and are gone afterwards.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_hook_matches_departures(
                max_bytes in 1u64..120,
                ops in prop::collection::vec(op(), 0..200)
            ) {
                let evicted = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
                let sink = Arc::clone(&evicted);
                let mut cache = SegmentedLru::with_eviction_hook(max_bytes, move |k: &str, _: &String| {
                    sink.lock().push(k.to_string());
                });

                let mut inserted = 0usize;
                for op in ops {
                    match op {
                        Op::Put(k, n) => {
                            let key = format!("k{k}");
                            if !cache.contains(&key) {
                                inserted += 1;
                            }
                            let before = evicted.lock().len();
                            cache.put(&key, "x".repeat(n));
                            for gone in &evicted.lock()[before..] {
                                prop_assert!(!cache.contains(gone));
                            }
                        },
                        Op::Get(k) => {
                            cache.get(&format!("k{k}"));
                        },
                    }
                }
                prop_assert_eq!(inserted, cache.len() + evicted.lock().len());
            }

            /// Values read back are the last values written.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_get_returns_last_put(
                ops in prop::collection::vec((0u8..8, 0usize..8), 1..100)
            ) {
                let mut cache = SegmentedLru::new(0);
                let mut model = std::collections::HashMap::new();
                for (k, n) in ops {
                    let key = format!("k{k}");
                    cache.put(&key, "y".repeat(n));
                    model.insert(key, n);
                }
                for (key, n) in model {
                    prop_assert_eq!(cache.get(&key).map(String::len), Some(n));
                }
            }
        }
    }
}
