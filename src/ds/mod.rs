pub mod intrusive_list;
pub mod node_selector;
pub mod slot_arena;

pub use intrusive_list::{Linked, Links, ListHead};
pub use node_selector::{fnv1_64, jump_hash, HashFn, NodeSelector};
pub use slot_arena::{SlotArena, SlotId};
