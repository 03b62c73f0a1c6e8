//! Error types for the seglru library.
//!
//! ## Key Components
//!
//! - [`InvariantError`]: Returned when internal bookkeeping invariants are
//!   violated (`check_invariants` on the eviction engine).
//! - [`ConfigError`]: Returned when a group or handler is configured with
//!   invalid parameters (empty group name, malformed base path).
//! - [`LoadError`]: Returned by [`Group::get`](crate::group::Group::get) when
//!   a key is neither cached nor loadable.
//! - [`HandlerError`]: Returned by
//!   [`HttpPool::handle`](crate::http::HttpPool::handle); maps onto an HTTP
//!   status code.
//!
//! A byte budget that can no longer be honoured (over budget with nothing
//! left to evict) is not represented here. That state means the accounting
//! itself is corrupt, and the engine panics instead of returning.
//!
//! ## Example Usage
//!
//! ```
//! use seglru::error::ConfigError;
//! use seglru::group::{GetterFn, Group};
//!
//! let bad = Group::try_new("", 1024, GetterFn::new(|_key: &str| Ok(Vec::new())));
//! assert!(matches!(bad, Err(ConfigError { .. })));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when configuration parameters are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    msg: String,
}

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// LoadError
// ---------------------------------------------------------------------------

/// Boxed error produced by a [`Getter`](crate::group::Getter).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned when a group cannot produce a value for a key.
#[derive(Debug)]
pub enum LoadError {
    /// The key was empty; there is nothing to look up.
    EmptyKey,
    /// The key was not cached and the loader failed.
    Loader { key: String, source: BoxError },
}

impl LoadError {
    /// The key that failed to load, if there was one.
    pub fn key(&self) -> Option<&str> {
        match self {
            LoadError::EmptyKey => None,
            LoadError::Loader { key, .. } => Some(key),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::EmptyKey => f.write_str("key is required"),
            LoadError::Loader { key, source } => write!(f, "failed to load {key}: {source}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::EmptyKey => None,
            LoadError::Loader { source, .. } => Some(source.as_ref()),
        }
    }
}

// ---------------------------------------------------------------------------
// HandlerError
// ---------------------------------------------------------------------------

/// Error returned by the request handler, one variant per HTTP outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The path is under the base path but is not `<group>/<key>`.
    BadRequest(String),
    /// The path is not under the handler's base path at all.
    UnexpectedPath(String),
    /// No group is registered under this name.
    NoSuchGroup(String),
    /// The group could not produce the key.
    NoSuchKey(String),
}

impl HandlerError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::BadRequest(_) | HandlerError::UnexpectedPath(_) => 400,
            HandlerError::NoSuchGroup(_) | HandlerError::NoSuchKey(_) => 404,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::BadRequest(path) => write!(f, "bad request: {path}"),
            HandlerError::UnexpectedPath(path) => write!(f, "unexpected path: {path}"),
            HandlerError::NoSuchGroup(name) => write!(f, "no such group: {name}"),
            HandlerError::NoSuchKey(key) => write!(f, "no such key: {key}"),
        }
    }
}

impl std::error::Error for HandlerError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
