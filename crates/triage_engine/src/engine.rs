use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use chrono::Utc;
use thiserror::Error;
use triage_logging::{triage_debug, triage_warn};

use crate::backend::{BackendSettings, ReqwestBackend, TriageBackend};
use crate::ingest::{IngestSettings, IngestSink, IngestionTracker};
use crate::{BackendError, EngineEvent, IngestEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    FetchItems { request: u64 },
    CheckDismissed,
    Dismiss { id: String },
    Restore { id: String },
    Defer { id: String, hours: u32 },
    DismissAll,
    RestoreDismissed,
    CleanupSession,
    /// `batch` tags every event the upload produces.
    StartIngestion { batch: u64, files: Vec<PathBuf> },
    StopIngestion,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Sending half of the engine; cheap to clone.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

/// Receiving half of the engine.
pub struct EngineEvents {
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(
        backend: BackendSettings,
        ingest: IngestSettings,
    ) -> Result<(Self, EngineEvents), EngineError> {
        let backend = ReqwestBackend::new(backend)?;
        Self::with_backend(Arc::new(backend), ingest)
    }

    pub fn with_backend(
        backend: Arc<dyn TriageBackend>,
        ingest: IngestSettings,
    ) -> Result<(Self, EngineEvents), EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let tracker = IngestionTracker::new(backend.clone(), ingest);

        thread::spawn(move || {
            let _context = runtime.enter();
            // Ingestion commands run here, in arrival order, so a stop always sees the
            // batch started before it. Backend calls are spawned and may finish in any order.
            while let Ok(command) = cmd_rx.recv() {
                triage_debug!("engine command {command:?}");
                match command {
                    EngineCommand::StartIngestion { batch, files } => {
                        let sink = Arc::new(ChannelIngestSink {
                            tx: event_tx.clone(),
                            batch,
                        });
                        if let Err(err) = tracker.start(files, sink) {
                            triage_warn!("upload {batch} not started: {err}");
                            let _ = event_tx.send(EngineEvent::IngestNotStarted {
                                batch,
                                message: err.to_string(),
                            });
                        }
                    }
                    EngineCommand::StopIngestion => tracker.stop(),
                    command => {
                        if command == EngineCommand::CleanupSession {
                            tracker.stop();
                        }
                        runtime.spawn(handle_command(backend.clone(), command, event_tx.clone()));
                    }
                }
            }
            triage_debug!("engine command channel closed");
        });

        Ok((Self { cmd_tx }, EngineEvents { event_rx }))
    }

    pub fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            triage_warn!("engine is gone, command dropped");
        }
    }
}

impl EngineEvents {
    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks until the next event; `None` once the engine has shut down.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}

struct ChannelIngestSink {
    tx: mpsc::Sender<EngineEvent>,
    batch: u64,
}

impl IngestSink for ChannelIngestSink {
    fn emit(&self, event: IngestEvent) {
        let _ = self.tx.send(EngineEvent::Ingest {
            batch: self.batch,
            event,
        });
    }
}

async fn handle_command(
    backend: Arc<dyn TriageBackend>,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::FetchItems { request } => {
            let result = backend.fetch_items().await;
            EngineEvent::ItemsFetched {
                request,
                result,
                fetched_at: Utc::now(),
            }
        }
        EngineCommand::CheckDismissed => EngineEvent::DismissedStatus {
            result: backend.has_dismissed().await,
        },
        EngineCommand::Dismiss { id } => {
            let result = backend.dismiss(&id).await;
            EngineEvent::Dismissed { id, result }
        }
        EngineCommand::Restore { id } => {
            let result = backend.restore(&id).await;
            EngineEvent::Restored { id, result }
        }
        EngineCommand::Defer { id, hours } => {
            let result = backend.defer(&id, hours).await;
            EngineEvent::Deferred { id, result }
        }
        EngineCommand::DismissAll => EngineEvent::DismissedAll {
            result: backend.dismiss_all().await,
        },
        EngineCommand::RestoreDismissed => EngineEvent::RestoredAll {
            result: backend.restore_dismissed().await,
        },
        EngineCommand::CleanupSession => EngineEvent::SessionCleaned {
            result: backend.cleanup_session().await,
        },
        // Handled on the engine thread.
        EngineCommand::StartIngestion { .. } | EngineCommand::StopIngestion => return,
    };
    let _ = event_tx.send(event);
}
