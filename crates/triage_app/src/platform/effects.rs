use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use triage_core::{
    BackendFailure, BulkSummary, Effect, Item, ItemId, ItemPayload, Msg, UploadProgress,
};
use triage_engine::{
    BackendError, BackendErrorKind, BulkOutcome, EngineCommand, EngineEvent, EngineEvents,
    EngineHandle, IngestEvent, ProgressReport, RemoteItem,
};
use triage_logging::{triage_debug, triage_info, triage_warn};

use super::console::Input;
use super::persistence;
use super::render;

pub struct EffectRunner {
    engine: EngineHandle,
    state_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        events: EngineEvents,
        state_dir: PathBuf,
        input_tx: mpsc::Sender<Input>,
    ) -> Self {
        spawn_event_loop(events, input_tx);
        Self { engine, state_dir }
    }

    /// Executes effects and returns the lines to show the user.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<String> {
        let mut output = Vec::new();
        for effect in effects {
            match effect {
                Effect::FetchItems { request } => {
                    self.engine.send(EngineCommand::FetchItems { request })
                }
                Effect::CheckDismissed => self.engine.send(EngineCommand::CheckDismissed),
                Effect::Dismiss { id } => self.engine.send(EngineCommand::Dismiss {
                    id: id.as_str().to_string(),
                }),
                Effect::Restore { id } => self.engine.send(EngineCommand::Restore {
                    id: id.as_str().to_string(),
                }),
                Effect::DeferRemote { id, hours } => self.engine.send(EngineCommand::Defer {
                    id: id.as_str().to_string(),
                    hours,
                }),
                Effect::ConfirmClearAll { count } => output.push(render::clear_all_prompt(count)),
                Effect::DismissAll => self.engine.send(EngineCommand::DismissAll),
                Effect::RestoreAll => self.engine.send(EngineCommand::RestoreDismissed),
                Effect::ConfirmCleanup => output.push(render::cleanup_prompt()),
                Effect::CleanupSession => self.engine.send(EngineCommand::CleanupSession),
                Effect::SubmitUpload { batch, files } => {
                    triage_info!("submitting upload {batch} with {} file(s)", files.len());
                    self.engine.send(EngineCommand::StartIngestion { batch, files });
                }
                Effect::StopIngestion => self.engine.send(EngineCommand::StopIngestion),
                Effect::PersistClientFlags(flags) => {
                    persistence::save_client_flags(&self.state_dir, flags)
                }
                Effect::Notify(notice) => output.push(render::notice_line(&notice)),
            }
        }
        output
    }
}

fn spawn_event_loop(events: EngineEvents, input_tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        while let Some(event) = events.recv() {
            if input_tx.send(Input::Msg(map_event(event))).is_err() {
                return;
            }
        }
        triage_debug!("engine event stream ended");
    });
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::ItemsFetched {
            request,
            result,
            fetched_at,
        } => Msg::ItemsLoaded {
            request,
            result: result
                .map(|items| items.into_iter().map(to_item).collect())
                .map_err(to_failure),
            fetched_at,
        },
        EngineEvent::Dismissed { id, result } => Msg::DismissCompleted {
            id: ItemId::from(id),
            result: result.map_err(to_failure),
        },
        EngineEvent::Restored { id, result } => Msg::RestoreCompleted {
            id: ItemId::from(id),
            result: result.map_err(to_failure),
        },
        EngineEvent::Deferred { id, result } => Msg::DeferCompleted {
            id: ItemId::from(id),
            result: result.map_err(to_failure),
        },
        EngineEvent::DismissedAll { result } => Msg::ClearAllCompleted {
            result: result.map(to_summary).map_err(to_failure),
        },
        EngineEvent::RestoredAll { result } => Msg::RestoreAllCompleted {
            result: result.map(to_summary).map_err(to_failure),
        },
        EngineEvent::DismissedStatus { result } => Msg::DismissedStatusReceived {
            result: result.map_err(to_failure),
        },
        EngineEvent::SessionCleaned { result } => Msg::CleanupCompleted {
            result: result.map(to_summary).map_err(to_failure),
        },
        EngineEvent::IngestNotStarted { batch, message } => not_started(batch, message),
        EngineEvent::Ingest { batch, event } => map_ingest(batch, event),
    }
}

fn map_ingest(batch: u64, event: IngestEvent) -> Msg {
    match event {
        IngestEvent::Unreadable { message } => not_started(batch, message),
        IngestEvent::Accepted { total_files } => Msg::UploadAccepted { batch, total_files },
        IngestEvent::Rejected(err) => Msg::UploadRejected {
            batch,
            failure: to_failure(err),
        },
        IngestEvent::TimedOutPossiblyAccepted => Msg::UploadTimedOut { batch },
        IngestEvent::Progress { report, elapsed } | IngestEvent::Finished { report, elapsed } => {
            Msg::IngestionProgress {
                batch,
                progress: to_progress(report),
                elapsed,
            }
        }
        IngestEvent::Failed(err) => Msg::IngestionFailed {
            batch,
            failure: to_failure(err),
        },
    }
}

fn not_started(batch: u64, message: String) -> Msg {
    Msg::UploadRejected {
        batch,
        failure: BackendFailure::Rejected {
            status: None,
            message,
        },
    }
}

fn to_item(remote: RemoteItem) -> Item {
    Item {
        id: ItemId::from(remote.id),
        created_at: remote.created_at,
        priority_score: remote.priority_score,
        deferred_until: remote.deferred_until,
        payload: ItemPayload {
            filename: remote.filename,
            path: remote.path,
            text_content: remote.text_content,
        },
    }
}

fn to_failure(err: BackendError) -> BackendFailure {
    match err.kind {
        BackendErrorKind::HttpStatus(status) => BackendFailure::Rejected {
            status: Some(status),
            message: err.message,
        },
        BackendErrorKind::Rejected | BackendErrorKind::Decode => BackendFailure::Rejected {
            status: None,
            message: err.message,
        },
        BackendErrorKind::Network | BackendErrorKind::Timeout | BackendErrorKind::InvalidUrl => {
            triage_warn!("backend unreachable: {err}");
            BackendFailure::Network(err.to_string())
        }
    }
}

fn to_summary(outcome: BulkOutcome) -> BulkSummary {
    BulkSummary {
        message: outcome.message,
        count: outcome.count,
    }
}

fn to_progress(report: ProgressReport) -> UploadProgress {
    UploadProgress {
        processed: report.processed,
        total: report.total,
        completed: report.completed,
    }
}
