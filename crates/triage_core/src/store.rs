use triage_logging::triage_warn;

use crate::{Item, ItemId};

/// Ordered queue of active items. Ids are unique within the queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemStore {
    items: Vec<Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly fetched list. `keep` runs before the swap so rejected
    /// items never enter the queue; duplicate ids keep their first occurrence.
    pub fn replace_all<F>(&mut self, items: Vec<Item>, mut keep: F)
    where
        F: FnMut(&Item) -> bool,
    {
        let mut next: Vec<Item> = Vec::with_capacity(items.len());
        for item in items {
            if !keep(&item) {
                continue;
            }
            if next.iter().any(|existing| existing.id == item.id) {
                triage_warn!("Dropping duplicate item id={} from load", item.id);
                continue;
            }
            next.push(item);
        }
        self.items = next;
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        let index = self.index_of(id)?;
        Some(self.items.remove(index))
    }

    /// Append at the tail. Returns false (and leaves the queue alone) if the id is already queued.
    pub fn append(&mut self, item: Item) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Insert at `index`, clamped to `[0, len]`. Returns the index actually used,
    /// or `None` if the id is already queued.
    pub fn insert_at(&mut self, item: Item, index: usize) -> Option<usize> {
        if self.contains(&item.id) {
            return None;
        }
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        Some(index)
    }

    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn get_index(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }
}
