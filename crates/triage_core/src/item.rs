use std::fmt;

use chrono::{DateTime, Utc};

/// Backend-assigned identifier. Backends emit either integers or opaque
/// strings, so the id is kept as text and compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Content carried with an item. Never inspected by the queue logic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemPayload {
    pub filename: String,
    pub path: String,
    pub text_content: Option<String>,
}

/// One triage-able screenshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub created_at: DateTime<Utc>,
    /// In `[0, 1]`. Informational only; never affects queue order.
    pub priority_score: f64,
    pub deferred_until: Option<DateTime<Utc>>,
    pub payload: ItemPayload,
}

impl Item {
    /// True when the item is still deferred at `now` and must stay out of the active queue.
    pub fn is_deferred_at(&self, now: DateTime<Utc>) -> bool {
        self.deferred_until.is_some_and(|until| until > now)
    }

    pub fn priority_tier(&self) -> PriorityTier {
        PriorityTier::from_score(self.priority_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityTier {
    #[default]
    Low,
    Medium,
    High,
}

impl PriorityTier {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            PriorityTier::High
        } else if score > 0.4 {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }
}
