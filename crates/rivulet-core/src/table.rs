//! Generational slot storage for nodes and patches.
//!
//! Freed slots go on a free list and are handed out again, so the table stays
//! as large as the most entries ever live at once. Each slot carries a
//! generation that is bumped on removal; a handle only resolves while its
//! generation matches, so stale handles keep failing after their slot is
//! reused.

use std::marker::PhantomData;

/// A copyable handle made of a slot index and a generation.
pub(crate) trait Handle: Copy + PartialEq {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(self) -> u32;
    fn generation(self) -> u32;

    #[inline]
    fn slot(self) -> usize {
        self.index() as usize
    }
}

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

pub(crate) struct Table<K, T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
    _handle: PhantomData<K>,
}

impl<K: Handle, T> Default for Table<K, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
            _handle: PhantomData,
        }
    }
}

impl<K: Handle, T> Table<K, T> {
    /// Handle the next [`insert`](Self::insert) will return.
    pub fn next_handle(&self) -> K {
        match self.free.last() {
            Some(&index) => K::from_parts(index, self.entries[index as usize].generation),
            None => K::from_parts(self.entries.len() as u32, 0),
        }
    }

    pub fn insert(&mut self, value: T) -> K {
        let handle = self.next_handle();
        if self.free.pop().is_some() {
            self.entries[handle.slot()].value = Some(value);
        } else {
            self.entries.push(Entry {
                generation: 0,
                value: Some(value),
            });
        }
        self.len += 1;
        handle
    }

    pub fn remove(&mut self, handle: K) -> Option<T> {
        let entry = self.entries.get_mut(handle.slot())?;
        if entry.generation != handle.generation() {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.len -= 1;
        Some(value)
    }

    #[inline]
    pub fn get(&self, handle: K) -> Option<&T> {
        self.entries
            .get(handle.slot())
            .filter(|e| e.generation == handle.generation())?
            .value
            .as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, handle: K) -> Option<&mut T> {
        self.entries
            .get_mut(handle.slot())
            .filter(|e| e.generation == handle.generation())?
            .value
            .as_mut()
    }

    /// Move a value out without freeing its slot. Pair with [`restore`](Self::restore).
    #[inline]
    pub fn take(&mut self, handle: K) -> Option<T> {
        self.entries
            .get_mut(handle.slot())
            .filter(|e| e.generation == handle.generation())?
            .value
            .take()
    }

    #[inline]
    pub fn restore(&mut self, handle: K, value: T) {
        if let Some(entry) = self.entries.get_mut(handle.slot()) {
            entry.value = Some(value);
        }
    }

    /// Live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Slots allocated, live or free.
    pub fn slots(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Key(u32, u32);

    impl Handle for Key {
        fn from_parts(index: u32, generation: u32) -> Self {
            Key(index, generation)
        }
        fn index(self) -> u32 {
            self.0
        }
        fn generation(self) -> u32 {
            self.1
        }
    }

    #[test]
    fn freed_slots_are_reused_with_a_new_generation() {
        let mut table: Table<Key, &str> = Table::default();
        let a = table.insert("a");
        let b = table.insert("b");
        assert_eq!(table.remove(a), Some("a"));
        assert_eq!(table.next_handle(), Key(0, 1));

        let c = table.insert("c");
        assert_eq!(c, Key(0, 1));
        assert_eq!(table.slots(), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a), None);
        assert_eq!(table.get(c), Some(&"c"));
        assert_eq!(table.get(b), Some(&"b"));
    }

    #[test]
    fn stale_handles_cannot_remove() {
        let mut table: Table<Key, u8> = Table::default();
        let a = table.insert(1);
        table.remove(a);
        let b = table.insert(2);
        assert_eq!(table.remove(a), None);
        assert_eq!(table.get(b), Some(&2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn take_and_restore_keep_the_slot() {
        let mut table: Table<Key, u8> = Table::default();
        let a = table.insert(1);
        let value = table.take(a).unwrap();
        assert_eq!(table.get(a), None);
        assert_eq!(table.len(), 1);
        table.restore(a, value + 1);
        assert_eq!(table.get(a), Some(&2));
        assert_eq!(table.next_handle(), Key(1, 0));
    }
}
