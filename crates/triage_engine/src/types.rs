use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// An item as the backend describes it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteItem {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub priority_score: f64,
    #[serde(default, deserialize_with = "de_optional_timestamp")]
    pub deferred_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub text_content: Option<String>,
}

/// Result of a bulk call (`dismiss-all`, `restore-dismissed`, `cleanup-session`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkOutcome {
    pub message: Option<String>,
    pub count: Option<u32>,
}

/// One answer from the ingestion progress endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressReport {
    pub processed: u32,
    pub total: u32,
    pub completed: bool,
}

/// A file ready to be submitted for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// A selected file could not be read; nothing was sent.
    Unreadable { message: String },
    /// The backend took the batch and will process `total_files` in the background.
    Accepted { total_files: u32 },
    Rejected(BackendError),
    /// Gateway or server timeout on submit; the batch may still be running server-side.
    TimedOutPossiblyAccepted,
    Progress {
        report: ProgressReport,
        elapsed: Duration,
    },
    Finished {
        report: ProgressReport,
        elapsed: Duration,
    },
    /// Polling gave up after repeated failures.
    Failed(BackendError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ItemsFetched {
        request: u64,
        result: Result<Vec<RemoteItem>, BackendError>,
        fetched_at: DateTime<Utc>,
    },
    Dismissed {
        id: String,
        result: Result<(), BackendError>,
    },
    Restored {
        id: String,
        result: Result<(), BackendError>,
    },
    Deferred {
        id: String,
        result: Result<(), BackendError>,
    },
    DismissedAll {
        result: Result<BulkOutcome, BackendError>,
    },
    RestoredAll {
        result: Result<BulkOutcome, BackendError>,
    },
    DismissedStatus {
        result: Result<bool, BackendError>,
    },
    SessionCleaned {
        result: Result<BulkOutcome, BackendError>,
    },
    /// The upload was refused before any work was scheduled (nothing selected).
    IngestNotStarted { batch: u64, message: String },
    /// Progress of the upload tagged `batch`.
    Ingest { batch: u64, event: IngestEvent },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Timeout-class failures where the server may have accepted the request anyway.
    pub fn is_ambiguous_timeout(&self) -> bool {
        match self.kind {
            BackendErrorKind::Timeout => true,
            BackendErrorKind::HttpStatus(status) => status == 408 || status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    InvalidUrl,
    Network,
    Timeout,
    HttpStatus(u16),
    /// 2xx answer carrying `success: false`.
    Rejected,
    Decode,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorKind::InvalidUrl => write!(f, "invalid url"),
            BackendErrorKind::Network => write!(f, "network error"),
            BackendErrorKind::Timeout => write!(f, "timeout"),
            BackendErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            BackendErrorKind::Rejected => write!(f, "rejected"),
            BackendErrorKind::Decode => write!(f, "unexpected response"),
        }
    }
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(value) => value.to_string(),
        RawId::Text(value) => value,
    })
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

fn de_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}"))),
    }
}

/// RFC 3339, or naive ISO-8601 which the backend writes in UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
