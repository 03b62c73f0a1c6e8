pub use crate::builder::CacheBuilder;
pub use crate::byte_view::ByteView;
pub use crate::ds::{fnv1_64, jump_hash, HashFn, NodeSelector, SlotArena, SlotId};
pub use crate::error::{BoxError, ConfigError, HandlerError, InvariantError, LoadError};
pub use crate::group::{get_group, Getter, GetterFn, Group};
pub use crate::http::{HttpPool, Response, DEFAULT_BASE_PATH};
pub use crate::policy::slru::{
    ConcurrentSegmentedLru, EvictionHook, Segment, SegmentedLru, ENTRY_OVERHEAD, PROTECTED_RATIO,
};
pub use crate::traits::Value;
