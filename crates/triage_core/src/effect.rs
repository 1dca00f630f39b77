use std::path::PathBuf;

use crate::{ClientFlags, ItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the item list; the answer must come back tagged with `request`.
    FetchItems { request: u64 },
    CheckDismissed,
    Dismiss { id: ItemId },
    Restore { id: ItemId },
    /// Legacy server-side defer.
    DeferRemote { id: ItemId, hours: u32 },
    /// Ask the user before dismissing `count` items.
    ConfirmClearAll { count: usize },
    DismissAll,
    RestoreAll,
    ConfirmCleanup,
    CleanupSession,
    SubmitUpload { batch: u64, files: Vec<PathBuf> },
    StopIngestion,
    PersistClientFlags(ClientFlags),
    Notify(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    /// Not a failure, e.g. nothing to undo.
    Info,
    /// Input rejected before any network call.
    Validation,
    /// Outcome unknown server-side; user should wait and refresh.
    Warning,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }
}
