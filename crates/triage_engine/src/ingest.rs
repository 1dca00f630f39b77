use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use triage_logging::{triage_debug, triage_info, triage_warn};

use crate::{IngestEvent, TriageBackend, UploadFile};

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub poll_interval: Duration,
    /// Consecutive poll failures tolerated before the loop gives up.
    pub max_poll_failures: u32,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_poll_failures: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Please select at least one image file to upload")]
    NoFilesSelected,
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait IngestSink: Send + Sync {
    fn emit(&self, event: IngestEvent);
}

/// Submits batches and follows their background processing.
///
/// At most one poll loop runs at a time; starting a new batch cancels the previous loop.
pub struct IngestionTracker {
    backend: Arc<dyn TriageBackend>,
    settings: IngestSettings,
    active: Mutex<Option<CancellationToken>>,
}

impl IngestionTracker {
    pub fn new(backend: Arc<dyn TriageBackend>, settings: IngestSettings) -> Self {
        Self {
            backend,
            settings,
            active: Mutex::new(None),
        }
    }

    /// Registers the batch as the active one and spawns its read/submit/poll task on the
    /// current runtime. Any earlier loop is cancelled before this returns.
    ///
    /// Must be called from within a tokio runtime context.
    pub fn start(
        &self,
        files: Vec<PathBuf>,
        sink: Arc<dyn IngestSink>,
    ) -> Result<IngestionHandle, IngestError> {
        if files.is_empty() {
            return Err(IngestError::NoFilesSelected);
        }

        let token = CancellationToken::new();
        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.replace(token.clone()) {
                triage_debug!("replacing running ingestion loop");
                previous.cancel();
            }
        }

        let task = tokio::spawn(run_batch(
            self.backend.clone(),
            self.settings.clone(),
            files,
            sink,
            token.clone(),
        ));
        Ok(IngestionHandle { token, task })
    }

    /// Cancels the active loop, if any.
    pub fn stop(&self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(token) = active.take() {
                triage_info!("ingestion polling stopped");
                token.cancel();
            }
        }
    }
}

/// Handle to one submit/poll task. Dropping it leaves the task running.
pub struct IngestionHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl IngestionHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to end; a panicked task counts as ended.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

async fn read_batch(files: Vec<PathBuf>) -> Result<Vec<UploadFile>, IngestError> {
    let mut batch = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| IngestError::Read {
                path: path.clone(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        batch.push(UploadFile { file_name, bytes });
    }
    Ok(batch)
}

async fn run_batch(
    backend: Arc<dyn TriageBackend>,
    settings: IngestSettings,
    files: Vec<PathBuf>,
    sink: Arc<dyn IngestSink>,
    token: CancellationToken,
) {
    let read = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        result = read_batch(files) => result,
    };
    let batch = match read {
        Ok(batch) => batch,
        Err(err) => {
            triage_warn!("upload not started: {err}");
            sink.emit(IngestEvent::Unreadable {
                message: err.to_string(),
            });
            return;
        }
    };

    let started = Instant::now();
    let submitted = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        result = backend.submit_batch(batch) => result,
    };

    match submitted {
        Ok(total_files) => {
            triage_info!("batch accepted, {total_files} file(s) queued");
            sink.emit(IngestEvent::Accepted { total_files });
        }
        Err(err) if err.is_ambiguous_timeout() => {
            triage_warn!("submit timed out, batch may still be processing: {err}");
            sink.emit(IngestEvent::TimedOutPossiblyAccepted);
            return;
        }
        Err(err) => {
            triage_warn!("submit rejected: {err}");
            sink.emit(IngestEvent::Rejected(err));
            return;
        }
    }

    let mut ticker = tokio::time::interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; polling starts one interval later.
    ticker.tick().await;

    let mut failures = 0u32;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                triage_debug!("poll loop cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        let polled = tokio::select! {
            _ = token.cancelled() => return,
            result = backend.poll_progress() => result,
        };

        match polled {
            Ok(report) => {
                failures = 0;
                let elapsed = started.elapsed();
                if report.completed {
                    triage_info!("ingestion finished: {}/{}", report.processed, report.total);
                    sink.emit(IngestEvent::Finished { report, elapsed });
                    return;
                }
                if report.total == 0 {
                    continue;
                }
                sink.emit(IngestEvent::Progress { report, elapsed });
            }
            Err(err) => {
                failures += 1;
                triage_warn!(
                    "progress poll failed ({failures}/{}): {err}",
                    settings.max_poll_failures
                );
                if failures >= settings.max_poll_failures {
                    sink.emit(IngestEvent::Failed(err));
                    return;
                }
            }
        }
    }
}
