use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use triage_logging::{triage_debug, triage_info, triage_warn};

use crate::progress::estimate;
use crate::state::PendingOp;
use crate::{
    ActionRecord, AppState, BackendFailure, BulkOp, BulkSummary, Confirmation, DeferPosition,
    Effect, EmptyState, IngestionState, Item, ItemId, Msg, Notice, NoticeKind, TriggerSource,
    UploadProgress,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::LoadRequested => {
            let request = state.next_load_request();
            state.mark_dirty();
            vec![Effect::FetchItems { request }]
        }
        Msg::ItemsLoaded {
            request,
            result,
            fetched_at,
        } => apply_loaded(&mut state, request, result, fetched_at),
        Msg::DismissedStatusReceived { result } => apply_dismissed_status(&mut state, result),

        Msg::DismissRequested { id } => request_dismiss(&mut state, id),
        Msg::DismissCompleted { id, result } => complete_dismiss(&mut state, &id, result),
        Msg::DeferRequested {
            id,
            position,
            source,
            at,
        } => request_defer(&mut state, id, position, source, at),
        Msg::DeferCompleted { id, result } => complete_remote_defer(&mut state, &id, result),
        Msg::UndoRequested => request_undo(&mut state),
        Msg::RestoreCompleted { id, result } => complete_restore(&mut state, &id, result),

        Msg::ClearAllRequested => {
            if state.bulk.is_some() {
                triage_debug!("Clear all ignored: bulk operation in flight");
                Vec::new()
            } else if state.store.is_empty() {
                vec![Effect::Notify(Notice::info("No screenshots to clear"))]
            } else {
                state.confirmation = Some(Confirmation::ClearAll);
                state.mark_dirty();
                vec![Effect::ConfirmClearAll {
                    count: state.store.len(),
                }]
            }
        }
        Msg::ClearAllConfirmed => {
            if take_confirmation(&mut state, Confirmation::ClearAll) {
                start_bulk(&mut state, BulkOp::ClearAll, Effect::DismissAll)
            } else {
                Vec::new()
            }
        }
        Msg::ClearAllCompleted { result } => complete_clear_all(&mut state, result),
        Msg::RestoreAllRequested => start_bulk(&mut state, BulkOp::RestoreAll, Effect::RestoreAll),
        Msg::RestoreAllCompleted { result } => complete_restore_all(&mut state, result),
        Msg::CleanupRequested => {
            if state.bulk.is_some() {
                Vec::new()
            } else {
                state.confirmation = Some(Confirmation::Cleanup);
                state.mark_dirty();
                vec![Effect::ConfirmCleanup]
            }
        }
        Msg::CleanupConfirmed => {
            if take_confirmation(&mut state, Confirmation::Cleanup) {
                start_bulk(&mut state, BulkOp::Cleanup, Effect::CleanupSession)
            } else {
                Vec::new()
            }
        }
        Msg::CleanupCompleted { result } => complete_cleanup(&mut state, result),
        Msg::ConfirmationDeclined => {
            if state.confirmation.take().is_some() {
                state.mark_dirty();
            }
            Vec::new()
        }

        Msg::NavigateNext => {
            let len = state.store.len();
            if len > 0 {
                state.cursor = (state.cursor + 1) % len;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NavigatePrevious => {
            let len = state.store.len();
            if len > 0 {
                state.cursor = (state.cursor + len - 1) % len;
                state.mark_dirty();
            }
            Vec::new()
        }

        Msg::UploadRequested { files } => request_upload(&mut state, files),
        Msg::UploadAccepted { batch, total_files } => {
            if state.follows_upload(batch) {
                state.ingestion = IngestionState::Processing {
                    total_files,
                    progress: None,
                    estimate: None,
                };
                state.mark_dirty();
            } else {
                triage_debug!("Upload acceptance for batch {batch} ignored");
            }
            Vec::new()
        }
        Msg::UploadRejected { batch, failure } => {
            if state.follows_upload(batch) {
                state.ingestion = IngestionState::Idle;
                state.mark_dirty();
                vec![Effect::Notify(Notice::error(format!(
                    "Failed to upload screenshots: {failure}"
                )))]
            } else {
                triage_debug!("Upload rejection for batch {batch} ignored: {failure}");
                Vec::new()
            }
        }
        Msg::UploadTimedOut { batch } => {
            if state.follows_upload(batch) {
                state.ingestion = IngestionState::Idle;
                state.mark_dirty();
                vec![Effect::Notify(Notice::new(
                    NoticeKind::Warning,
                    "Processing timeout: your screenshots may still be processing in the background. \
                     Refresh in a minute to see your uploads.",
                ))]
            } else {
                Vec::new()
            }
        }
        Msg::IngestionProgress {
            batch,
            progress,
            elapsed,
        } => apply_ingestion_progress(&mut state, batch, progress, elapsed),
        Msg::IngestionFailed { batch, failure } => {
            if state.follows_upload(batch) {
                state.ingestion = IngestionState::Idle;
                state.mark_dirty();
                vec![Effect::Notify(Notice::error(format!(
                    "Lost track of upload progress: {failure}"
                )))]
            } else {
                Vec::new()
            }
        }
        Msg::StopUploadRequested => {
            if state.ingestion == IngestionState::Idle {
                Vec::new()
            } else {
                state.ingestion = IngestionState::Idle;
                state.mark_dirty();
                vec![Effect::StopIngestion]
            }
        }

        Msg::RestoreClientFlags(flags) => {
            state.flags = flags;
            state.mark_dirty();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn apply_loaded(
    state: &mut AppState,
    request: u64,
    result: Result<Vec<Item>, BackendFailure>,
    fetched_at: DateTime<Utc>,
) -> Vec<Effect> {
    if request != state.load_seq {
        triage_debug!(
            "Ignoring stale load result request={} latest={}",
            request,
            state.load_seq
        );
        return Vec::new();
    }
    state.loading = false;
    state.mark_dirty();

    let items = match result {
        Ok(items) => items,
        Err(failure) => {
            triage_warn!("Loading items failed: {}", failure);
            return vec![Effect::Notify(Notice::error(
                "Failed to load screenshots. Please try again.",
            ))];
        }
    };

    let fetched = items.len();
    state
        .store
        .replace_all(items, |item| !item.is_deferred_at(fetched_at));
    state.cursor = 0;
    triage_info!(
        "Loaded {} items ({} active after deferral filter)",
        fetched,
        state.store.len()
    );

    if state.store.is_empty() {
        state.empty_state = Some(EmptyState::Checking);
        state.show_hint = false;
        return vec![Effect::CheckDismissed];
    }

    state.empty_state = None;
    let mut changed = !state.flags.had_items;
    state.flags.had_items = true;
    state.show_hint = state.flags.hint_shown_count < state.settings().hint_limit;
    if state.show_hint {
        state.flags.hint_shown_count += 1;
        changed = true;
    }
    if changed {
        vec![Effect::PersistClientFlags(state.flags)]
    } else {
        Vec::new()
    }
}

fn apply_dismissed_status(state: &mut AppState, result: Result<bool, BackendFailure>) -> Vec<Effect> {
    if !state.store.is_empty() {
        return Vec::new();
    }
    let has_dismissed = match result {
        Ok(value) => value,
        Err(failure) => {
            triage_warn!("Dismissed-items check failed: {}", failure);
            false
        }
    };
    state.empty_state = Some(if has_dismissed && state.flags.had_items {
        EmptyState::AllDone
    } else {
        EmptyState::NoItems
    });
    state.mark_dirty();
    Vec::new()
}

fn request_dismiss(state: &mut AppState, id: ItemId) -> Vec<Effect> {
    if state.blocks_item_ops(&id) {
        triage_debug!("Dismiss of {} ignored: another operation is in flight", id);
        return Vec::new();
    }
    let Some(snapshot) = state.store.get(&id).cloned() else {
        triage_debug!("Dismiss of {} ignored: not in queue", id);
        return Vec::new();
    };
    state
        .in_flight
        .insert(id.clone(), PendingOp::Dismiss { snapshot });
    state.mark_dirty();
    vec![Effect::Dismiss { id }]
}

fn complete_dismiss(
    state: &mut AppState,
    id: &ItemId,
    result: Result<(), BackendFailure>,
) -> Vec<Effect> {
    let snapshot = match state.in_flight.remove(id) {
        Some(PendingOp::Dismiss { snapshot }) => snapshot,
        other => {
            triage_warn!("Unexpected dismiss completion for {}", id);
            restore_pending(state, id, other);
            return Vec::new();
        }
    };
    state.mark_dirty();

    if let Err(failure) = result {
        triage_warn!("Dismiss of {} failed: {}", id, failure);
        return vec![Effect::Notify(Notice::error(format!(
            "Failed to dismiss screenshot: {failure}"
        )))];
    }

    state.history.push(ActionRecord::Dismiss {
        item_id: id.clone(),
        snapshot,
    });
    state.remove_and_advance(id);

    let mut effects = vec![Effect::Notify(Notice::success("Dismissed"))];
    if state.store.is_empty() {
        effects.push(Effect::FetchItems {
            request: state.next_load_request(),
        });
    }
    effects
}

fn request_defer(
    state: &mut AppState,
    id: ItemId,
    position: DeferPosition,
    source: TriggerSource,
    at: Instant,
) -> Vec<Effect> {
    if state.blocks_item_ops(&id) {
        triage_debug!("Defer of {} ignored: another operation is in flight", id);
        return Vec::new();
    }
    let Some(index) = state.store.index_of(&id) else {
        triage_debug!("Defer of {} ignored: not in queue", id);
        return Vec::new();
    };

    match position {
        DeferPosition::End => {
            if !state.debounce.admit(source, at) {
                triage_debug!("Hold of {} ignored: too soon after previous hold", id);
                return Vec::new();
            }
            let Some(snapshot) = state.store.get_index(index).cloned() else {
                return Vec::new();
            };
            state.history.push(ActionRecord::Defer {
                item_id: id,
                snapshot,
                original_index: index,
            });
            state.move_to_end(index);
            state.mark_dirty();
            vec![Effect::Notify(Notice::success("Moved to end of queue"))]
        }
        DeferPosition::Later { hours } => {
            state.in_flight.insert(id.clone(), PendingOp::DeferRemote);
            state.mark_dirty();
            vec![Effect::DeferRemote { id, hours }]
        }
    }
}

fn complete_remote_defer(
    state: &mut AppState,
    id: &ItemId,
    result: Result<(), BackendFailure>,
) -> Vec<Effect> {
    match state.in_flight.remove(id) {
        Some(PendingOp::DeferRemote) => {}
        other => {
            restore_pending(state, id, other);
            return Vec::new();
        }
    }
    state.mark_dirty();

    if let Err(failure) = result {
        return vec![Effect::Notify(Notice::error(format!(
            "Failed to defer screenshot: {failure}"
        )))];
    }
    state.remove_and_advance(id);
    let mut effects = vec![Effect::Notify(Notice::success("Deferred"))];
    if state.store.is_empty() {
        effects.push(Effect::FetchItems {
            request: state.next_load_request(),
        });
    }
    effects
}

fn request_undo(state: &mut AppState) -> Vec<Effect> {
    if state.bulk.is_some() {
        triage_debug!("Undo ignored: bulk operation in flight");
        return Vec::new();
    }
    if state
        .in_flight
        .values()
        .any(|op| matches!(op, PendingOp::Restore { .. }))
    {
        triage_debug!("Undo ignored: previous undo still in flight");
        return Vec::new();
    }
    let Some(record) = state.history.pop_last() else {
        return vec![Effect::Notify(Notice::info("Nothing to undo"))];
    };
    if state.in_flight.contains_key(record.item_id()) {
        triage_debug!("Undo of {} deferred: item has an operation in flight", record.item_id());
        state.history.push(record);
        return Vec::new();
    }
    state.mark_dirty();

    match record {
        ActionRecord::Dismiss { .. } => {
            let id = record.item_id().clone();
            state
                .in_flight
                .insert(id.clone(), PendingOp::Restore { record });
            vec![Effect::Restore { id }]
        }
        ActionRecord::Defer {
            item_id,
            original_index,
            ..
        } => {
            let Some(item) = state.store.remove(&item_id) else {
                return vec![Effect::Notify(Notice::info(
                    "Cannot undo move (item no longer present)",
                ))];
            };
            let target = original_index.min(state.store.len());
            if let Some(index) = state.store.insert_at(item, target) {
                state.cursor = index;
            }
            vec![Effect::Notify(Notice::success("Undid move to end"))]
        }
    }
}

fn complete_restore(
    state: &mut AppState,
    id: &ItemId,
    result: Result<(), BackendFailure>,
) -> Vec<Effect> {
    let record = match state.in_flight.remove(id) {
        Some(PendingOp::Restore { record }) => record,
        other => {
            restore_pending(state, id, other);
            return Vec::new();
        }
    };
    state.mark_dirty();

    if let Err(failure) = result {
        triage_warn!("Restore of {} failed: {}", id, failure);
        state.history.push(record);
        return vec![Effect::Notify(Notice::error(
            "Failed to undo dismiss action",
        ))];
    }

    if let ActionRecord::Dismiss { snapshot, .. } = record {
        if !state.store.append(snapshot) {
            triage_debug!("Restored item {} already back in queue", id);
        }
        state.set_cursor_to(id);
        state.empty_state = None;
    }
    vec![Effect::Notify(Notice::success("Undid dismiss"))]
}

fn take_confirmation(state: &mut AppState, expected: Confirmation) -> bool {
    if state.confirmation == Some(expected) {
        state.confirmation = None;
        state.mark_dirty();
        true
    } else {
        triage_debug!("Confirmation {:?} arrived without a pending request", expected);
        false
    }
}

fn start_bulk(state: &mut AppState, op: BulkOp, effect: Effect) -> Vec<Effect> {
    if let Some(current) = state.bulk {
        triage_debug!("{:?} ignored: {:?} in flight", op, current);
        return Vec::new();
    }
    state.bulk = Some(op);
    state.mark_dirty();
    vec![effect]
}

fn finish_bulk(state: &mut AppState, op: BulkOp) {
    if state.bulk == Some(op) {
        state.bulk = None;
    }
    state.mark_dirty();
}

fn complete_clear_all(state: &mut AppState, result: Result<BulkSummary, BackendFailure>) -> Vec<Effect> {
    finish_bulk(state, BulkOp::ClearAll);
    match result {
        Ok(summary) => {
            state.store.clear();
            state.cursor = 0;
            let message = summary
                .message
                .unwrap_or_else(|| "Dismissed all screenshots".to_string());
            vec![
                Effect::Notify(Notice::success(message)),
                Effect::FetchItems {
                    request: state.next_load_request(),
                },
            ]
        }
        Err(failure) => vec![Effect::Notify(Notice::error(format!(
            "Failed to dismiss all screenshots: {failure}"
        )))],
    }
}

fn complete_restore_all(
    state: &mut AppState,
    result: Result<BulkSummary, BackendFailure>,
) -> Vec<Effect> {
    finish_bulk(state, BulkOp::RestoreAll);
    match result {
        Ok(summary) => vec![
            Effect::Notify(Notice::success(format!(
                "Restored {} screenshots",
                summary.count.unwrap_or(0)
            ))),
            Effect::FetchItems {
                request: state.next_load_request(),
            },
        ],
        Err(failure) => vec![Effect::Notify(Notice::error(format!(
            "Failed to restore dismissed screenshots: {failure}"
        )))],
    }
}

fn complete_cleanup(state: &mut AppState, result: Result<BulkSummary, BackendFailure>) -> Vec<Effect> {
    finish_bulk(state, BulkOp::Cleanup);
    match result {
        Ok(summary) => {
            let ingesting = state.ingestion != IngestionState::Idle;
            state.reset_session();
            let message = summary
                .message
                .unwrap_or_else(|| "Your session data has been cleared".to_string());
            let mut effects = Vec::with_capacity(4);
            if ingesting {
                effects.push(Effect::StopIngestion);
            }
            effects.push(Effect::PersistClientFlags(state.flags));
            effects.push(Effect::Notify(Notice::success(message)));
            effects.push(Effect::FetchItems {
                request: state.next_load_request(),
            });
            effects
        }
        Err(failure) => vec![Effect::Notify(Notice::error(format!(
            "Failed to clear session data: {failure}"
        )))],
    }
}

fn request_upload(state: &mut AppState, files: Vec<PathBuf>) -> Vec<Effect> {
    if files.is_empty() {
        return vec![Effect::Notify(Notice::new(
            NoticeKind::Validation,
            "Please select at least one image file to upload",
        ))];
    }
    let batch = state.next_upload_batch();
    state.ingestion = IngestionState::Submitting {
        file_count: files.len(),
    };
    state.mark_dirty();
    vec![Effect::SubmitUpload { batch, files }]
}

fn apply_ingestion_progress(
    state: &mut AppState,
    batch: u64,
    progress: UploadProgress,
    elapsed: Duration,
) -> Vec<Effect> {
    if !state.follows_upload(batch) {
        triage_debug!("Progress for batch {batch} ignored");
        return Vec::new();
    }
    let total_files = match state.ingestion {
        IngestionState::Idle => return Vec::new(),
        IngestionState::Submitting { file_count } => u32::try_from(file_count).unwrap_or(u32::MAX),
        IngestionState::Processing { total_files, .. } => total_files,
    };

    if progress.completed {
        state.ingestion = IngestionState::Idle;
        state.mark_dirty();
        return vec![
            Effect::Notify(Notice::success("Processing complete")),
            Effect::FetchItems {
                request: state.next_load_request(),
            },
        ];
    }
    if progress.total == 0 {
        return Vec::new();
    }

    state.ingestion = IngestionState::Processing {
        total_files,
        progress: Some(progress),
        estimate: estimate(progress, elapsed),
    };
    state.mark_dirty();
    Vec::new()
}

/// Puts back an in-flight entry that did not match the completion being handled.
fn restore_pending(state: &mut AppState, id: &ItemId, pending: Option<PendingOp>) {
    if let Some(op) = pending {
        triage_warn!("Completion for {} did not match pending {:?}", id, op);
        state.in_flight.insert(id.clone(), op);
    }
}
