//! Generational resource storage.
//!
//! Every device-owned resource lives in a [`Registry`] and is referred to by
//! a typed [`Handle`]. A handle carries the slot index plus the generation
//! the slot had when the resource was inserted; destroying a resource bumps
//! the slot's generation, so handles to destroyed resources resolve to
//! `None` instead of aliasing whatever got allocated into the slot next.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed handle into a [`Registry<T>`].
///
/// `PhantomData<fn() -> T>` keeps the handle `Send + Sync + Copy` regardless
/// of `T`.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// A handle that no live registry slot will ever match. Useful as a
    /// placeholder in tests and default-constructed settings.
    pub fn dangling() -> Self {
        Self::new(u32::MAX, u32::MAX)
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

// Manual impls: derive would bound them on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot-based storage with generation checks and free-list index reuse.
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            Handle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            Handle::new(index, 0)
        }
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Remove the resource, bumping the slot generation so the handle (and
    /// any copies of it) go stale.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(value)
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }

    /// Drain every live resource, invalidating all outstanding handles.
    /// Bookkeeping is updated per yielded item, so a partially consumed
    /// drain leaves the registry consistent.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        let live = &mut self.live;
        let free = &mut self.free;
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                let value = slot.value.take()?;
                slot.generation = slot.generation.wrapping_add(1);
                free.push(index as u32);
                *live -= 1;
                Some(value)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut registry = Registry::new();
        let a = registry.insert("a");
        let b = registry.insert("b");
        assert_eq!(registry.get(a), Some(&"a"));
        assert_eq!(registry.get(b), Some(&"b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn stale_handle_after_remove() {
        let mut registry = Registry::new();
        let a = registry.insert(1);
        assert_eq!(registry.remove(a), Some(1));
        assert_eq!(registry.get(a), None);
        assert_eq!(registry.remove(a), None);
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut registry = Registry::new();
        let a = registry.insert(1);
        registry.remove(a);
        let b = registry.insert(2);
        // The slot is reused but the old handle stays stale.
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert_eq!(registry.get(a), None);
        assert_eq!(registry.get(b), Some(&2));
    }

    #[test]
    fn dangling_handle_resolves_to_none() {
        let registry: Registry<u32> = Registry::new();
        assert_eq!(registry.get(Handle::dangling()), None);
    }

    #[test]
    fn partially_consumed_drain_stays_consistent() {
        let mut registry = Registry::new();
        let a = registry.insert(1);
        let b = registry.insert(2);
        {
            let mut drain = registry.drain();
            assert_eq!(drain.next(), Some(1));
        }
        // Only the yielded slot was freed.
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(a), None);
        assert_eq!(registry.get(b), Some(&2));
    }

    #[test]
    fn drain_invalidates_everything() {
        let mut registry = Registry::new();
        let a = registry.insert(1);
        let b = registry.insert(2);
        let drained: Vec<_> = registry.drain().collect();
        assert_eq!(drained, vec![1, 2]);
        assert!(registry.is_empty());
        assert_eq!(registry.get(a), None);
        assert_eq!(registry.get(b), None);
    }
}
