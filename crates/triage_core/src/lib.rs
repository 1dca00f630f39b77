//! Triage core: pure queue state machine and view-model helpers.
//!
//! Every user action and backend answer is a [`Msg`]; [`update`] applies it
//! and returns the [`Effect`]s the platform must run. Local queue mutations for
//! dismiss, undo and bulk calls happen only after the backend confirms them;
//! defer-to-end is the one purely local action.
mod debounce;
mod effect;
mod history;
mod item;
mod msg;
mod progress;
mod state;
mod store;
mod update;
mod view_model;

pub use debounce::{DebounceGuard, TriggerSource, DEFAULT_DEFER_COOLDOWN};
pub use effect::{Effect, Notice, NoticeKind};
pub use history::{ActionHistory, ActionRecord};
pub use item::{Item, ItemId, ItemPayload, PriorityTier};
pub use msg::{BackendFailure, BulkSummary, DeferPosition, Msg};
pub use progress::{estimate, format_remaining, ProgressEstimate, UploadProgress};
pub use state::{
    AppState, BulkOp, ClientFlags, Confirmation, CoreSettings, EmptyState, IngestionState,
};
pub use store::ItemStore;
pub use update::update;
pub use view_model::{AppViewModel, IngestionView, ItemRowView};
