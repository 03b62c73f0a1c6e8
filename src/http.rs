//! Transport-agnostic request handler for group lookups.
//!
//! [`HttpPool`] maps a request path of the form
//! `<base_path><group>/<key>` onto [`Group::get`](crate::group::Group::get)
//! and returns either the value bytes or a [`HandlerError`] carrying the
//! HTTP status to answer with. It owns no socket; plug
//! [`handle`](HttpPool::handle) into whatever server is already running.
//!
//! ```text
//!   GET /_seglru/scores/tom
//!       └──┬───┘ └──┬─┘ └┬┘
//!      base_path  group  key  (split once: keys may contain '/')
//! ```

use tracing::info;

use crate::byte_view::ByteView;
use crate::error::{ConfigError, HandlerError};
use crate::group::get_group;

/// Base path used by [`HttpPool::new`].
pub const DEFAULT_BASE_PATH: &str = "/_seglru/";

/// Content type of every successful response.
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub content_type: &'static str,
    pub body: ByteView,
}

/// Serves group values for one node.
///
/// # Example
///
/// ```
/// use seglru::group::{GetterFn, Group};
/// use seglru::http::HttpPool;
///
/// Group::new("http-doc", 1 << 10, GetterFn::new(|key: &str| Ok(key.to_uppercase().into_bytes())));
///
/// let pool = HttpPool::new("localhost:9999");
/// let response = pool.handle("GET", "/_seglru/http-doc/tom").unwrap();
/// assert_eq!(response.body.as_slice(), b"TOM");
///
/// let err = pool.handle("GET", "/_seglru/missing-group/tom").unwrap_err();
/// assert_eq!(err.status_code(), 404);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpPool {
    self_addr: String,
    base_path: String,
}

impl HttpPool {
    /// Creates a handler for `self_addr` under [`DEFAULT_BASE_PATH`].
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self {
            self_addr: self_addr.into(),
            base_path: DEFAULT_BASE_PATH.to_owned(),
        }
    }

    /// Creates a handler under a custom base path.
    ///
    /// The base path must start and end with `/` and name at least one
    /// segment, e.g. `/cache/`.
    pub fn try_new(
        self_addr: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_path = base_path.into();
        if base_path.len() < 3 || !base_path.starts_with('/') || !base_path.ends_with('/') {
            return Err(ConfigError::new(format!(
                "base path must look like \"/name/\", got {base_path:?}"
            )));
        }
        Ok(Self {
            self_addr: self_addr.into(),
            base_path,
        })
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resolves `path` to a group value.
    pub fn handle(&self, method: &str, path: &str) -> Result<Response, HandlerError> {
        let Some(rest) = path.strip_prefix(self.base_path.as_str()) else {
            return Err(HandlerError::UnexpectedPath(path.to_owned()));
        };
        info!("[Server {}] {} {}", self.self_addr, method, path);

        let Some((group_name, key)) = rest.split_once('/') else {
            return Err(HandlerError::BadRequest(path.to_owned()));
        };

        let group =
            get_group(group_name).ok_or_else(|| HandlerError::NoSuchGroup(group_name.to_owned()))?;
        let body = group
            .get(key)
            .map_err(|_| HandlerError::NoSuchKey(key.to_owned()))?;

        Ok(Response {
            content_type: CONTENT_TYPE,
            body,
        })
    }
}
