//! Arena-style store: a dense vector plus an id→index map.
//!
//! Gives stable insertion-order iteration and O(1) lookup without
//! depending on any ordered-map guarantee. Used for triage decisions and
//! managed patches, both keyed by uuid.

use ahash::AHashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Store<T> {
    items: Vec<T>,
    index: AHashMap<Uuid, usize>,
}

impl<T> Store<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: AHashMap::new(),
        }
    }

    /// Insert or replace the value for `id`. Replacing keeps the original
    /// insertion position, so iteration order is stable across re-runs.
    pub fn insert(&mut self, id: Uuid, value: T) {
        match self.index.get(&id) {
            Some(&slot) => self.items[slot] = value,
            None => {
                self.index.insert(id, self.items.len());
                self.items.push(value);
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&T> {
        self.index.get(id).map(|&slot| &self.items[slot])
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut T> {
        match self.index.get(id) {
            Some(&slot) => self.items.get_mut(slot),
            None => None,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}
