use std::collections::BTreeMap;
use std::time::Duration;

use crate::debounce::DEFAULT_DEFER_COOLDOWN;
use crate::view_model::{AppViewModel, IngestionView, ItemRowView};
use crate::{
    ActionHistory, ActionRecord, DebounceGuard, Item, ItemId, ItemStore, ProgressEstimate,
    UploadProgress,
};

/// Tunables for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreSettings {
    pub defer_cooldown: Duration,
    /// How many times the first-run hint is shown.
    pub hint_limit: u32,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            defer_cooldown: DEFAULT_DEFER_COOLDOWN,
            hint_limit: 2,
        }
    }
}

/// Client-side state that survives restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientFlags {
    /// Items have been shown at least once; selects "all done" over "no items yet".
    pub had_items: bool,
    pub hint_shown_count: u32,
}

/// What to show when the active queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// Waiting for the dismissed-items check.
    Checking,
    NoItems,
    AllDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    ClearAll,
    Cleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOp {
    ClearAll,
    RestoreAll,
    Cleanup,
}

/// An outstanding backend call tied to one item.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingOp {
    Dismiss { snapshot: Item },
    /// Undo of a dismiss; the record goes back on the stack if the call fails.
    Restore { record: ActionRecord },
    DeferRemote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestionState {
    #[default]
    Idle,
    Submitting {
        file_count: usize,
    },
    Processing {
        total_files: u32,
        progress: Option<UploadProgress>,
        estimate: Option<ProgressEstimate>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    settings: CoreSettings,
    pub(crate) store: ItemStore,
    pub(crate) history: ActionHistory,
    pub(crate) debounce: DebounceGuard,
    pub(crate) cursor: usize,
    pub(crate) in_flight: BTreeMap<ItemId, PendingOp>,
    pub(crate) bulk: Option<BulkOp>,
    pub(crate) confirmation: Option<Confirmation>,
    pub(crate) load_seq: u64,
    pub(crate) upload_seq: u64,
    pub(crate) loading: bool,
    pub(crate) empty_state: Option<EmptyState>,
    pub(crate) flags: ClientFlags,
    pub(crate) show_hint: bool,
    pub(crate) ingestion: IngestionState,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_settings(CoreSettings::default())
    }

    pub fn with_settings(settings: CoreSettings) -> Self {
        Self {
            settings,
            debounce: DebounceGuard::new(settings.defer_cooldown),
            ..Self::default()
        }
    }

    pub fn settings(&self) -> CoreSettings {
        self.settings
    }

    pub fn items(&self) -> &ItemStore {
        &self.store
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub fn client_flags(&self) -> ClientFlags {
        self.flags
    }

    pub fn ingestion(&self) -> IngestionState {
        self.ingestion
    }

    pub fn current_id(&self) -> Option<&ItemId> {
        self.store.get_index(self.cursor).map(|item| &item.id)
    }

    pub fn is_in_flight(&self, id: &ItemId) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn view(&self) -> AppViewModel {
        let items: Vec<ItemRowView> = self.store.iter().map(ItemRowView::from_item).collect();
        let current = (!items.is_empty()).then_some(self.cursor.min(items.len() - 1));
        let counter_text = if items.is_empty() {
            "No items".to_string()
        } else {
            format!("{} remaining", items.len())
        };
        AppViewModel {
            current_id: current.map(|index| items[index].id.clone()),
            current,
            counter_text,
            empty_state: if items.is_empty() {
                self.empty_state
            } else {
                None
            },
            item_count: items.len(),
            items,
            show_hint: self.show_hint,
            pending_ids: self.in_flight.keys().cloned().collect(),
            can_undo: !self.history.is_empty(),
            busy: self.loading || self.bulk.is_some(),
            awaiting_confirmation: self.confirmation,
            ingestion: IngestionView::from_state(self.ingestion),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Item-level mutations wait for bulk calls to finish.
    pub(crate) fn blocks_item_ops(&self, id: &ItemId) -> bool {
        self.bulk.is_some() || self.in_flight.contains_key(id)
    }

    pub(crate) fn next_load_request(&mut self) -> u64 {
        self.load_seq += 1;
        self.loading = true;
        self.load_seq
    }

    pub(crate) fn next_upload_batch(&mut self) -> u64 {
        self.upload_seq += 1;
        self.upload_seq
    }

    /// True when `batch` is the upload the session is still following.
    pub(crate) fn follows_upload(&self, batch: u64) -> bool {
        self.ingestion != IngestionState::Idle && batch == self.upload_seq
    }

    /// Remove `id` and keep the cursor on the item that followed it, wrapping to the first.
    pub(crate) fn remove_and_advance(&mut self, id: &ItemId) -> Option<Item> {
        let index = self.store.index_of(id)?;
        let removed = self.store.remove(id);
        if index < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.store.len() {
            self.cursor = 0;
        }
        removed
    }

    pub(crate) fn move_to_end(&mut self, index: usize) {
        let Some(item) = self.store.get_index(index).cloned() else {
            return;
        };
        let was_last = index + 1 == self.store.len();
        self.store.remove(&item.id);
        self.store.append(item);
        if index < self.cursor {
            self.cursor -= 1;
        } else if index == self.cursor && was_last {
            self.cursor = 0;
        }
    }

    pub(crate) fn set_cursor_to(&mut self, id: &ItemId) {
        if let Some(index) = self.store.index_of(id) {
            self.cursor = index;
        }
    }

    /// Drops everything the session accumulated; persisted hint bookkeeping survives.
    pub(crate) fn reset_session(&mut self) {
        self.store.clear();
        self.history.clear();
        self.debounce.reset();
        self.in_flight.clear();
        self.cursor = 0;
        self.confirmation = None;
        self.empty_state = None;
        self.show_hint = false;
        self.flags.had_items = false;
        self.ingestion = IngestionState::Idle;
    }
}
