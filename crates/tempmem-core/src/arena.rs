//! Generation-checked arena used as the allocation pool for symbols, slots,
//! preferences and WMEs.
//!
//! Handles are `(index, generation)` pairs. Freeing an entry bumps its
//! generation, so a handle kept past its entry's lifetime resolves to `None`
//! instead of aliasing whatever reuses the entry.

use serde::{Deserialize, Serialize};

/// Raw arena handle. Wrapped by the typed ids in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Index {
    index: u32,
    generation: u32,
}

impl Index {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

/// Pool of `T` with handle reuse and an optional hard capacity.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
    capacity: Option<usize>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
            capacity: None,
        }
    }

    /// Arena that refuses to hold more than `capacity` live entries.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    pub fn capacity_limit(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `value`, reusing a freed entry when one exists.
    /// Returns `None` when the capacity limit has been reached.
    pub fn insert(&mut self, value: T) -> Option<Index> {
        if let Some(cap) = self.capacity {
            if self.len >= cap {
                return None;
            }
        }

        let index = match self.free.pop() {
            Some(i) => {
                let entry = &mut self.entries[i as usize];
                let generation = match entry {
                    Entry::Vacant { generation } => *generation,
                    Entry::Occupied { .. } => unreachable!("free list points at a live entry"),
                };
                *entry = Entry::Occupied { generation, value };
                Index {
                    index: i,
                    generation,
                }
            }
            None => {
                let i = u32::try_from(self.entries.len()).ok()?;
                self.entries.push(Entry::Occupied {
                    generation: 0,
                    value,
                });
                Index {
                    index: i,
                    generation: 0,
                }
            }
        };
        self.len += 1;
        Some(index)
    }

    /// Free the entry behind `handle`, returning its value.
    pub fn remove(&mut self, handle: Index) -> Option<T> {
        let entry = self.entries.get_mut(handle.index as usize)?;
        let generation = match entry {
            Entry::Occupied { generation, .. } if *generation == handle.generation => *generation,
            _ => return None,
        };
        let next = Entry::Vacant {
            generation: generation.wrapping_add(1),
        };
        match std::mem::replace(entry, next) {
            Entry::Occupied { value, .. } => {
                self.free.push(handle.index);
                self.len -= 1;
                Some(value)
            }
            Entry::Vacant { .. } => None,
        }
    }

    pub fn get(&self, handle: Index) -> Option<&T> {
        match self.entries.get(handle.index as usize)? {
            Entry::Occupied { generation, value } if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Index) -> Option<&mut T> {
        match self.entries.get_mut(handle.index as usize)? {
            Entry::Occupied { generation, value } if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn contains(&self, handle: Index) -> bool {
        self.get(handle).is_some()
    }

    /// Iterate live entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| match e {
            Entry::Occupied { generation, value } => Some((
                Index {
                    index: i as u32,
                    generation: *generation,
                },
                value,
            )),
            Entry::Vacant { .. } => None,
        })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares a typed, `Copy` handle over [`Index`].
macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub(crate) $crate::arena::Index);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}.{}", $prefix, self.0.index(), self.0.generation())
            }
        }
    };
}

pub(crate) use arena_id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut arena = Arena::new();
        let a = arena.insert("a").unwrap();
        let b = arena.insert("b").unwrap();
        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut arena = Arena::new();
        let a = arena.insert(1).unwrap();
        assert_eq!(arena.remove(a), Some(1));
        let b = arena.insert(2).unwrap();

        // Same entry, new generation.
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b), Some(&2));
        assert!(arena.remove(a).is_none());
    }

    #[test]
    fn test_capacity_limit() {
        let mut arena = Arena::with_capacity_limit(2);
        let a = arena.insert(1).unwrap();
        arena.insert(2).unwrap();
        assert!(arena.insert(3).is_none());

        arena.remove(a);
        assert!(arena.insert(3).is_some());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_iter_skips_vacant() {
        let mut arena = Arena::new();
        let a = arena.insert('a').unwrap();
        arena.insert('b').unwrap();
        arena.remove(a);
        let live: Vec<char> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(live, vec!['b']);
    }
}
