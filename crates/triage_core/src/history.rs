use crate::{Item, ItemId};

/// Enough information to reverse one user action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRecord {
    Dismiss {
        item_id: ItemId,
        snapshot: Item,
    },
    Defer {
        item_id: ItemId,
        snapshot: Item,
        original_index: usize,
    },
}

impl ActionRecord {
    pub fn item_id(&self) -> &ItemId {
        match self {
            ActionRecord::Dismiss { item_id, .. } | ActionRecord::Defer { item_id, .. } => item_id,
        }
    }
}

/// Undo stack, one entry per successful action.
///
/// Only the top entry is guaranteed to be reversible. Older entries are kept
/// but undoing past the top is best-effort: later actions may have made them stale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionHistory {
    records: Vec<ActionRecord>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    pub fn pop_last(&mut self) -> Option<ActionRecord> {
        self.records.pop()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
