//! Triage engine: backend client, ingestion tracking and state-file IO.
mod backend;
mod engine;
mod ingest;
mod persist;
mod types;

pub use backend::{BackendSettings, ReqwestBackend, TriageBackend, UPLOAD_FIELD};
pub use engine::{EngineCommand, EngineError, EngineEvents, EngineHandle};
pub use ingest::{IngestError, IngestSettings, IngestSink, IngestionHandle, IngestionTracker};
pub use persist::{ensure_state_dir, read_optional, write_atomic, PersistError};
pub use types::{
    parse_timestamp, BackendError, BackendErrorKind, BulkOutcome, EngineEvent, IngestEvent,
    ProgressReport, RemoteItem, UploadFile,
};
