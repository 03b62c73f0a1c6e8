//! Named cache namespaces backed by a loader.
//!
//! A [`Group`] pairs a [`ConcurrentSegmentedLru`] of [`ByteView`]s with a
//! [`Getter`] that knows how to produce a value on a miss. Groups register
//! themselves in a process-wide table on construction and are looked up by
//! name with [`get_group`].
//!
//! ## Read Path
//!
//! ```text
//!   Group::get(key)
//!       │
//!       ├── key == ""          → Err(LoadError::EmptyKey)
//!       │
//!       ├── cache hit          → Ok(view)            (admission rule applies)
//!       │
//!       └── miss → getter.get(key)
//!                    ├── Ok(bytes) → view = ByteView::from(bytes)
//!                    │               cache.add(key, view.clone())
//!                    │               Ok(view)
//!                    └── Err(e)    → Err(LoadError::Loader { key, source: e })
//! ```
//!
//! Concurrent misses on the same key each call the getter; the last write
//! wins in the cache.
//!
//! ## Registry
//!
//! The table is created on first use and never shrinks. Registering a name
//! that already exists replaces the earlier group.
//!
//! ## Example Usage
//!
//! ```
//! use seglru::group::{get_group, GetterFn, Group};
//!
//! let scores = Group::new("doc-scores", 2 << 10, GetterFn::new(|key: &str| match key {
//!     "tom" => Ok(b"630".to_vec()),
//!     other => Err(format!("{other} not exist").into()),
//! }));
//!
//! assert_eq!(scores.get("tom").unwrap().to_string(), "630");
//! assert!(scores.get("unknown").is_err());
//!
//! let same = get_group("doc-scores").unwrap();
//! assert_eq!(same.name(), "doc-scores");
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::byte_view::ByteView;
use crate::error::{BoxError, ConfigError, LoadError};
use crate::policy::slru::ConcurrentSegmentedLru;

/// Produces the bytes for a key on a cache miss.
pub trait Getter: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError>;
}

/// Adapts a closure into a [`Getter`].
pub struct GetterFn<F>(F);

impl<F> GetterFn<F>
where
    F: Fn(&str) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Getter for GetterFn<F>
where
    F: Fn(&str) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        (self.0)(key)
    }
}

impl<G: Getter + ?Sized> Getter for Arc<G> {
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        (**self).get(key)
    }
}

type Registry = RwLock<FxHashMap<String, Arc<Group>>>;

fn registry() -> &'static Registry {
    static GROUPS: OnceLock<Registry> = OnceLock::new();
    GROUPS.get_or_init(|| RwLock::new(FxHashMap::default()))
}

/// A named, loader-backed cache namespace.
pub struct Group {
    name: String,
    cache: ConcurrentSegmentedLru<ByteView>,
    getter: Box<dyn Getter>,
}

impl Group {
    /// Creates and registers a group.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty. Use [`try_new`](Self::try_new) to get an
    /// error instead.
    pub fn new(name: &str, max_bytes: u64, getter: impl Getter + 'static) -> Arc<Group> {
        match Self::try_new(name, max_bytes, getter) {
            Ok(group) => group,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates and registers a group, replacing any group with the same name.
    pub fn try_new(
        name: &str,
        max_bytes: u64,
        getter: impl Getter + 'static,
    ) -> Result<Arc<Group>, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::new("group name must not be empty"));
        }

        let group = Arc::new(Group {
            name: name.to_owned(),
            cache: ConcurrentSegmentedLru::new(max_bytes),
            getter: Box::new(getter),
        });

        let replaced = registry()
            .write()
            .insert(name.to_owned(), Arc::clone(&group))
            .is_some();
        info!(group = %name, max_bytes, replaced, "registered group");
        Ok(group)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group's local cache.
    pub fn cache(&self) -> &ConcurrentSegmentedLru<ByteView> {
        &self.cache
    }

    /// Returns the value for `key`, loading and caching it on a miss.
    pub fn get(&self, key: &str) -> Result<ByteView, LoadError> {
        if key.is_empty() {
            return Err(LoadError::EmptyKey);
        }

        if let Some(view) = self.cache.get(key) {
            debug!(group = %self.name, key = %key, "cache hit");
            return Ok(view);
        }

        self.load(key)
    }

    fn load(&self, key: &str) -> Result<ByteView, LoadError> {
        info!(group = %self.name, key = %key, "loading from getter");
        match self.getter.get(key) {
            Ok(bytes) => {
                let view = ByteView::from(bytes);
                self.cache.add(key, view.clone());
                Ok(view)
            },
            Err(source) => {
                warn!(group = %self.name, key = %key, error = %source, "getter failed");
                Err(LoadError::Loader {
                    key: key.to_owned(),
                    source,
                })
            },
        }
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Looks up a registered group. An empty name never matches.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    if name.is_empty() {
        return None;
    }
    registry().read().get(name).cloned()
}
