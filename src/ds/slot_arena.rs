//! Entry storage addressed by stable slot ids.
//!
//! Every cached entry lives in one slot for its whole lifetime, so the key
//! index and both segment lists can refer to it by [`SlotId`] while it is
//! relinked between segments. Vacated slots form a chain threaded through
//! the vacant slots themselves; the next insert takes the most recently
//! vacated slot.
//!
//! ```text
//!   slots:  [ Occupied(e0) | Vacant(next: None) | Occupied(e2) | Vacant(next: 1) ]
//!                                   ▲                                 ▲
//!                                   └──────────── next_vacant ◄───────┘ (head = 3)
//! ```
//!
//! A `SlotId` is only meaningful until its slot is vacated; after that the
//! same index may hold an unrelated entry.

/// Stable handle to an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) usize);

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    Vacant { next_vacant: Option<usize> },
}

/// Slot storage that recycles vacated slots before growing.
#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    vacant_head: Option<usize>,
    occupied: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant_head: None,
            occupied: 0,
        }
    }

    /// Stores `value`, reusing the most recently vacated slot if any.
    pub fn insert(&mut self, value: T) -> SlotId {
        self.occupied += 1;
        if let Some(idx) = self.vacant_head {
            if let Slot::Vacant { next_vacant } = self.slots[idx] {
                self.vacant_head = next_vacant;
            }
            self.slots[idx] = Slot::Occupied(value);
            return SlotId(idx);
        }
        self.slots.push(Slot::Occupied(value));
        SlotId(self.slots.len() - 1)
    }

    /// Vacates `id` and hands back its value. `None` if already vacant.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }
        let vacated = Slot::Vacant {
            next_vacant: self.vacant_head,
        };
        let Slot::Occupied(value) = std::mem::replace(slot, vacated) else {
            return None;
        };
        self.vacant_head = Some(id.0);
        self.occupied -= 1;
        Some(value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        match self.slots.get(id.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        match self.slots.get_mut(id.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Drops every entry and invalidates all ids.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.vacant_head = None;
        self.occupied = 0;
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
