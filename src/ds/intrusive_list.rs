//! Index-linked doubly linked lists over a shared `SlotArena`.
//!
//! A [`ListHead`] owns only `head`, `tail` and a length. The nodes, and the
//! `prev`/`next` links inside them, live in a [`SlotArena`] that several
//! heads may share. Moving a node from one list to another is an unlink
//! followed by a push: the node keeps its [`SlotId`], so any external index
//! pointing at it stays valid.
//!
//! ## Architecture
//!
//! ```text
//!   arena (SlotArena<T: Linked>)
//!   ┌────────┬──────────────────────────────────────┐
//!   │ SlotId │ T { .., links: Links { prev, next } }│
//!   ├────────┼──────────────────────────────────────┤
//!   │ id_0   │ { prev: None,       next: Some(id_2) }  ◄── list A
//!   │ id_1   │ { prev: None,       next: None       }  ◄── list B
//!   │ id_2   │ { prev: Some(id_0), next: None       }  ◄── list A
//!   └────────┴──────────────────────────────────────┘
//!
//!   A: head ─► [id_0] ◄──► [id_2] ◄── tail
//!   B: head ─► [id_1] ◄── tail
//! ```
//!
//! ## Operations
//! - `push_front(id)`: O(1), node must not be linked into any list
//! - `unlink(id)`: O(1), node must be linked into *this* list
//! - `move_to_front(id)`: O(1)
//! - `pop_back()`: O(1), unlinks and returns the LRU id without freeing it
//!
//! The arena is never freed by a `ListHead`; callers remove the slot after
//! unlinking it.

use crate::ds::slot_arena::{SlotArena, SlotId};

/// `prev`/`next` links embedded in a list node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Links {
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

impl Links {
    pub fn prev(&self) -> Option<SlotId> {
        self.prev
    }

    pub fn next(&self) -> Option<SlotId> {
        self.next
    }
}

/// Arena values that can be threaded onto a [`ListHead`].
pub trait Linked {
    fn links(&self) -> &Links;
    fn links_mut(&mut self) -> &mut Links;
}

/// Head/tail/length of one list whose nodes live in an external arena.
///
/// Front is most-recently-used, back is least-recently-used.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListHead {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl ListHead {
    /// Creates an empty list.
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Id at the front (MRU) of the list.
    pub fn front(&self) -> Option<SlotId> {
        self.head
    }

    /// Id at the back (LRU) of the list.
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }

    /// Links `id` at the front. Returns `false` if `id` is not in `arena`.
    ///
    /// The node must not currently be linked into any list.
    pub fn push_front<T: Linked>(&mut self, arena: &mut SlotArena<T>, id: SlotId) -> bool {
        let old_head = self.head;
        match arena.get_mut(id) {
            Some(node) => {
                let links = node.links_mut();
                links.prev = None;
                links.next = old_head;
            },
            None => return false,
        }

        match old_head.and_then(|h| arena.get_mut(h)) {
            Some(head_node) => head_node.links_mut().prev = Some(id),
            None => self.tail = Some(id),
        }

        self.head = Some(id);
        self.len += 1;
        true
    }

    /// Unlinks `id` from this list, leaving its slot allocated.
    ///
    /// Returns `false` if `id` is not in `arena`. The node must be linked
    /// into this list; unlinking a node that belongs to another list
    /// corrupts both.
    pub fn unlink<T: Linked>(&mut self, arena: &mut SlotArena<T>, id: SlotId) -> bool {
        let Links { prev, next } = match arena.get(id) {
            Some(node) => *node.links(),
            None => return false,
        };

        match prev.and_then(|p| arena.get_mut(p)) {
            Some(prev_node) => prev_node.links_mut().next = next,
            None => self.head = next,
        }

        match next.and_then(|n| arena.get_mut(n)) {
            Some(next_node) => next_node.links_mut().prev = prev,
            None => self.tail = prev,
        }

        if let Some(node) = arena.get_mut(id) {
            *node.links_mut() = Links::default();
        }

        self.len -= 1;
        true
    }

    /// Moves a node already in this list to the front.
    pub fn move_to_front<T: Linked>(&mut self, arena: &mut SlotArena<T>, id: SlotId) -> bool {
        if self.head == Some(id) {
            return arena.contains(id);
        }
        self.unlink(arena, id) && self.push_front(arena, id)
    }

    /// Unlinks the back (LRU) node and returns its id.
    pub fn pop_back<T: Linked>(&mut self, arena: &mut SlotArena<T>) -> Option<SlotId> {
        let id = self.tail?;
        self.unlink(arena, id).then_some(id)
    }

    /// Forgets every node without touching the arena.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Iterates ids from front (MRU) to back (LRU).
    pub fn iter<'a, T: Linked>(&self, arena: &'a SlotArena<T>) -> ListIter<'a, T> {
        ListIter {
            arena,
            current: self.head,
        }
    }

    /// Walks the list checking link symmetry and the tracked length.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants<T: Linked>(&self, arena: &SlotArena<T>) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len, 0);
            return;
        }

        let mut seen = std::collections::HashSet::new();
        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;

        while let Some(id) = current {
            assert!(seen.insert(id), "cycle at {:?}", id);
            let node = arena.get(id).expect("linked node missing from arena");
            assert_eq!(node.links().prev, prev);
            if node.links().next.is_none() {
                assert_eq!(self.tail, Some(id));
            }
            prev = Some(id);
            current = node.links().next;
            count += 1;
            assert!(count <= self.len);
        }

        assert_eq!(count, self.len);
    }
}

/// Iterator over the ids of a [`ListHead`], front to back.
pub struct ListIter<'a, T> {
    arena: &'a SlotArena<T>,
    current: Option<SlotId>,
}

impl<'a, T: Linked> Iterator for ListIter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.arena.get(id)?;
        self.current = node.links().next;
        Some((id, node))
    }
}
