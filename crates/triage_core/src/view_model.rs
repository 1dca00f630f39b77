use chrono::{DateTime, Utc};

use crate::progress::format_remaining;
use crate::{Confirmation, EmptyState, IngestionState, Item, ItemId, PriorityTier};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub items: Vec<ItemRowView>,
    pub item_count: usize,
    /// Index of the visible item.
    pub current: Option<usize>,
    pub current_id: Option<ItemId>,
    pub counter_text: String,
    pub empty_state: Option<EmptyState>,
    pub show_hint: bool,
    pub pending_ids: Vec<ItemId>,
    pub can_undo: bool,
    pub busy: bool,
    pub awaiting_confirmation: Option<Confirmation>,
    pub ingestion: Option<IngestionView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRowView {
    pub id: ItemId,
    pub filename: String,
    pub path: String,
    pub priority_score: f64,
    pub tier: PriorityTier,
    pub created_at: DateTime<Utc>,
    pub text_content: Option<String>,
}

impl ItemRowView {
    pub(crate) fn from_item(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            filename: item.payload.filename.clone(),
            path: item.payload.path.clone(),
            priority_score: item.priority_score,
            tier: item.priority_tier(),
            created_at: item.created_at,
            text_content: item.payload.text_content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionView {
    pub submitting: bool,
    pub processed: u32,
    pub total: u32,
    pub percent: u8,
    pub remaining_text: Option<String>,
}

impl IngestionView {
    pub(crate) fn from_state(state: IngestionState) -> Option<Self> {
        match state {
            IngestionState::Idle => None,
            IngestionState::Submitting { file_count } => Some(Self {
                submitting: true,
                processed: 0,
                total: u32::try_from(file_count).unwrap_or(u32::MAX),
                percent: 0,
                remaining_text: None,
            }),
            IngestionState::Processing {
                total_files,
                progress,
                estimate,
            } => Some(Self {
                submitting: false,
                processed: progress.map_or(0, |p| p.processed),
                total: progress
                    .map(|p| p.total)
                    .filter(|total| *total > 0)
                    .unwrap_or(total_files),
                percent: estimate.map_or(0, |e| e.percent),
                remaining_text: estimate
                    .and_then(|e| e.remaining)
                    .and_then(format_remaining),
            }),
        }
    }
}
