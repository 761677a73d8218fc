use serde::{Deserialize, Serialize};

use crate::ObjectId;

/// The agent's carried objects, in pickup order, bounded by a capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<ObjectId>,
    capacity: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn contains(&self, item: ObjectId) -> bool {
        self.items.contains(&item)
    }

    /// True if every item in `items` is carried.
    pub fn contains_all(&self, items: &[ObjectId]) -> bool {
        items.iter().all(|&item| self.contains(item))
    }

    /// Adds an item unless the inventory is full. Returns whether it was added.
    pub fn try_add(&mut self, item: ObjectId) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Removes every listed item that is carried, keeping the order of the rest.
    pub fn spend(&mut self, items: &[ObjectId]) {
        self.items.retain(|item| !items.contains(item));
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[ObjectId] {
        &self.items
    }
}
