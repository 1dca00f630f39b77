use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::{ClientFlags, Item, ItemId, TriggerSource, UploadProgress};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Fetch the authoritative item list.
    LoadRequested,
    /// Result of a `FetchItems` effect. `fetched_at` is the clock reading taken with the fetch.
    ItemsLoaded {
        request: u64,
        result: Result<Vec<Item>, BackendFailure>,
        fetched_at: DateTime<Utc>,
    },
    /// Backend answer to "are there dismissed items?".
    DismissedStatusReceived { result: Result<bool, BackendFailure> },

    DismissRequested { id: ItemId },
    DismissCompleted {
        id: ItemId,
        result: Result<(), BackendFailure>,
    },
    DeferRequested {
        id: ItemId,
        position: DeferPosition,
        source: TriggerSource,
        at: Instant,
    },
    /// Completion of the legacy server-side defer.
    DeferCompleted {
        id: ItemId,
        result: Result<(), BackendFailure>,
    },
    UndoRequested,
    RestoreCompleted {
        id: ItemId,
        result: Result<(), BackendFailure>,
    },

    ClearAllRequested,
    ClearAllConfirmed,
    ClearAllCompleted { result: Result<BulkSummary, BackendFailure> },
    RestoreAllRequested,
    RestoreAllCompleted { result: Result<BulkSummary, BackendFailure> },
    CleanupRequested,
    CleanupConfirmed,
    CleanupCompleted { result: Result<BulkSummary, BackendFailure> },
    /// User answered "no" to a pending confirmation.
    ConfirmationDeclined,

    NavigateNext,
    NavigatePrevious,

    UploadRequested { files: Vec<PathBuf> },
    /// Upload messages carry the `batch` from the `SubmitUpload` effect that started them;
    /// anything but the latest batch is dropped.
    UploadAccepted { batch: u64, total_files: u32 },
    UploadRejected { batch: u64, failure: BackendFailure },
    /// Gateway or server timeout on submit: the batch may still be processing.
    UploadTimedOut { batch: u64 },
    IngestionProgress {
        batch: u64,
        progress: UploadProgress,
        elapsed: Duration,
    },
    IngestionFailed { batch: u64, failure: BackendFailure },
    StopUploadRequested,

    /// Restore persisted client-side flags at startup.
    RestoreClientFlags(ClientFlags),
    Tick,
    NoOp,
}

/// Where a defer sends the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferPosition {
    /// Move to the tail of the active queue. Local only.
    End,
    /// Legacy server-side defer for a number of hours. No current caller
    /// produces it; kept so old clients keep working.
    Later { hours: u32 },
}

/// Payload of a successful bulk call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkSummary {
    pub message: Option<String>,
    pub count: Option<u32>,
}

/// Why a backend call did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendFailure {
    /// The request never got a usable response.
    Network(String),
    /// The backend answered with an error status or `success: false`.
    Rejected {
        status: Option<u16>,
        message: String,
    },
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFailure::Network(message) => write!(f, "network error: {message}"),
            BackendFailure::Rejected {
                status: Some(status),
                message,
            } => write!(f, "rejected ({status}): {message}"),
            BackendFailure::Rejected {
                status: None,
                message,
            } => write!(f, "rejected: {message}"),
        }
    }
}
