//! A generational arena for storing bodies, shapes and constraints.
//!
//! Slots are reused lowest-index first so that the iteration order of the arena
//! only depends on the sequence of insertions and removals. Every slot carries a
//! generation that is bumped on removal, so an [`ArenaIndex`] to a removed value
//! never resolves to a value stored later in the same slot.

use std::collections::BinaryHeap;
use core::cmp::Reverse;

/// An index into an [`Arena`] with the generation of the slot at the time of insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ArenaIndex {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ArenaIndex {
    /// Returns the slot of the index.
    #[inline]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Returns the generation of the index.
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A generational arena with deterministic slot reuse.
#[derive(Clone, Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_slots: BinaryHeap<Reverse<u32>>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates a new, empty arena.
    #[inline]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: BinaryHeap::new(),
            len: 0,
        }
    }

    /// Inserts a value and returns its index.
    pub fn insert(&mut self, value: T) -> ArenaIndex {
        self.len += 1;

        if let Some(Reverse(slot)) = self.free_slots.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.value = Some(value);
            return ArenaIndex {
                slot,
                generation: entry.generation,
            };
        }

        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        ArenaIndex {
            slot,
            generation: 0,
        }
    }

    /// Removes the value at `index`, returning it if the index was still valid.
    pub fn remove(&mut self, index: ArenaIndex) -> Option<T> {
        let entry = self.slots.get_mut(index.slot as usize)?;
        if entry.generation != index.generation {
            return None;
        }

        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free_slots.push(Reverse(index.slot));
        self.len -= 1;
        Some(value)
    }

    /// Returns `true` if `index` refers to a live value.
    #[inline]
    pub fn contains(&self, index: ArenaIndex) -> bool {
        self.get(index).is_some()
    }

    /// Returns a reference to the value at `index`.
    #[inline]
    pub fn get(&self, index: ArenaIndex) -> Option<&T> {
        self.slots
            .get(index.slot as usize)
            .filter(|entry| entry.generation == index.generation)
            .and_then(|entry| entry.value.as_ref())
    }

    /// Returns a mutable reference to the value at `index`.
    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> Option<&mut T> {
        self.slots
            .get_mut(index.slot as usize)
            .filter(|entry| entry.generation == index.generation)
            .and_then(|entry| entry.value.as_mut())
    }

    /// Returns mutable references to two distinct values.
    ///
    /// Returns `None` if either index is invalid or if both refer to the same slot.
    pub fn get2_mut(&mut self, a: ArenaIndex, b: ArenaIndex) -> Option<(&mut T, &mut T)> {
        if a.slot == b.slot || !self.contains(a) || !self.contains(b) {
            return None;
        }

        let (low, high, flipped) = if a.slot < b.slot {
            (a.slot as usize, b.slot as usize, false)
        } else {
            (b.slot as usize, a.slot as usize, true)
        };
        let (head, tail) = self.slots.split_at_mut(high);
        let first = head[low].value.as_mut()?;
        let second = tail[0].value.as_mut()?;

        if flipped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    /// Returns the live index stored in `slot`, if any.
    #[inline]
    pub fn index_of_slot(&self, slot: u32) -> Option<ArenaIndex> {
        self.slots
            .get(slot as usize)
            .filter(|entry| entry.value.is_some())
            .map(|entry| ArenaIndex {
                slot,
                generation: entry.generation,
            })
    }

    /// Returns the number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of slots, including free ones. Every live slot is below this bound.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the arena stores no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over the live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ArenaIndex, &T)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| {
            entry.value.as_ref().map(|value| {
                (
                    ArenaIndex {
                        slot: slot as u32,
                        generation: entry.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Iterates mutably over the live values in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ArenaIndex, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(slot, entry)| {
            let generation = entry.generation;
            entry.value.as_mut().map(|value| {
                (
                    ArenaIndex {
                        slot: slot as u32,
                        generation,
                    },
                    value,
                )
            })
        })
    }

    /// Returns the indices of all live values in slot order.
    pub fn indices(&self) -> Vec<ArenaIndex> {
        self.iter().map(|(index, _)| index).collect()
    }
}

impl<T> core::ops::Index<ArenaIndex> for Arena<T> {
    type Output = T;

    /// Panics if the index is stale.
    #[inline]
    #[track_caller]
    fn index(&self, index: ArenaIndex) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("stale arena index {index:?}"),
        }
    }
}

impl<T> core::ops::IndexMut<ArenaIndex> for Arena<T> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: ArenaIndex) -> &mut T {
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("stale arena index {index:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_index_does_not_resolve() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        assert_eq!(arena.remove(a), Some("a"));

        // The slot is reused, but with a new generation.
        let b = arena.insert("b");
        assert_eq!(a.slot(), b.slot());
        assert_ne!(a.generation(), b.generation());
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.remove(a), None);
    }

    #[test]
    fn lowest_slot_is_reused_first() {
        let mut arena = Arena::new();
        let indices: Vec<_> = (0..4).map(|i| arena.insert(i)).collect();
        arena.remove(indices[2]);
        arena.remove(indices[1]);
        assert_eq!(arena.insert(10).slot(), 1);
        assert_eq!(arena.insert(11).slot(), 2);
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn get2_mut_returns_requested_order() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let (x, y) = arena.get2_mut(b, a).unwrap();
        assert_eq!((*x, *y), (2, 1));
        *x += 10;
        assert_eq!(arena.get(b), Some(&12));
        assert!(arena.get2_mut(a, a).is_none());
    }
}
