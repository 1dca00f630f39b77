use std::sync::Once;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use triage_core::{
    update, AppState, BackendFailure, Effect, Item, ItemId, ItemPayload, Msg, Notice, NoticeKind,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(triage_logging::initialize_for_tests);
}

fn item(id: u64, priority_score: f64) -> Item {
    Item {
        id: ItemId::from(id),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        priority_score,
        deferred_until: None,
        payload: ItemPayload {
            filename: format!("shot-{id}.png"),
            path: format!("temp_uploads/shot-{id}.png"),
            text_content: Some(format!("text {id}")),
        },
    }
}

fn loaded(items: Vec<Item>) -> AppState {
    let (state, _) = update(AppState::new(), Msg::LoadRequested);
    let (state, _) = update(
        state,
        Msg::ItemsLoaded {
            request: 1,
            result: Ok(items),
            fetched_at: Utc::now(),
        },
    );
    state
}

fn ids(state: &AppState) -> Vec<ItemId> {
    state.items().ids()
}

fn id(raw: u64) -> ItemId {
    ItemId::from(raw)
}

fn dismiss_ok(state: AppState, raw: u64) -> (AppState, Vec<Effect>) {
    let (state, effects) = update(state, Msg::DismissRequested { id: id(raw) });
    assert_eq!(effects, vec![Effect::Dismiss { id: id(raw) }]);
    update(
        state,
        Msg::DismissCompleted {
            id: id(raw),
            result: Ok(()),
        },
    )
}

#[test]
fn dismiss_then_undo_restores_item_at_tail() {
    init_logging();
    let state = loaded(vec![item(1, 0.91), item(2, 0.5), item(3, 0.1)]);

    let (state, effects) = dismiss_ok(state, 1);
    assert_eq!(ids(&state), vec![id(2), id(3)]);
    assert_eq!(effects, vec![Effect::Notify(Notice::success("Dismissed"))]);
    assert!(state.view().can_undo);

    let (state, effects) = update(state, Msg::UndoRequested);
    assert_eq!(effects, vec![Effect::Restore { id: id(1) }]);
    // Nothing moves until the backend confirms.
    assert_eq!(ids(&state), vec![id(2), id(3)]);

    let (state, effects) = update(
        state,
        Msg::RestoreCompleted {
            id: id(1),
            result: Ok(()),
        },
    );
    assert_eq!(ids(&state), vec![id(2), id(3), id(1)]);
    assert_eq!(effects, vec![Effect::Notify(Notice::success("Undid dismiss"))]);

    let restored = state.items().get(&id(1)).unwrap();
    assert_eq!(restored, &item(1, 0.91));
    assert_eq!(state.view().current_id, Some(id(1)));
}

#[test]
fn failed_dismiss_leaves_queue_untouched() {
    init_logging();
    let state = loaded(vec![item(1, 0.2), item(2, 0.2)]);

    let (state, _) = update(state, Msg::DismissRequested { id: id(1) });
    let (state, effects) = update(
        state,
        Msg::DismissCompleted {
            id: id(1),
            result: Err(BackendFailure::Network("connection refused".into())),
        },
    );

    assert_eq!(ids(&state), vec![id(1), id(2)]);
    assert!(state.history().is_empty());
    assert!(!state.is_in_flight(&id(1)));
    assert!(matches!(
        effects.as_slice(),
        [Effect::Notify(Notice { kind: NoticeKind::Error, .. })]
    ));

    // Still dismissible.
    let (_, effects) = update(state, Msg::DismissRequested { id: id(1) });
    assert_eq!(effects, vec![Effect::Dismiss { id: id(1) }]);
}

#[test]
fn second_dismiss_for_same_id_is_rejected_while_in_flight() {
    init_logging();
    let state = loaded(vec![item(1, 0.2), item(2, 0.2)]);

    let (state, first) = update(state, Msg::DismissRequested { id: id(1) });
    let (state, second) = update(state, Msg::DismissRequested { id: id(1) });

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert!(state.is_in_flight(&id(1)));
    assert_eq!(state.view().pending_ids, vec![id(1)]);
}

#[test]
fn dismissing_unknown_id_is_ignored() {
    init_logging();
    let state = loaded(vec![item(1, 0.2)]);

    let (state, effects) = update(state, Msg::DismissRequested { id: id(42) });

    assert!(effects.is_empty());
    assert_eq!(ids(&state), vec![id(1)]);
}

#[test]
fn dismissing_last_item_triggers_reload() {
    init_logging();
    let state = loaded(vec![item(7, 0.5)]);

    let (state, effects) = dismiss_ok(state, 7);

    assert!(state.items().is_empty());
    assert_eq!(
        effects,
        vec![
            Effect::Notify(Notice::success("Dismissed")),
            Effect::FetchItems { request: 2 },
        ]
    );
}

#[test]
fn dismiss_advances_to_following_item() {
    init_logging();
    let state = loaded(vec![item(1, 0.2), item(2, 0.2), item(3, 0.2)]);
    let (state, _) = update(state, Msg::NavigateNext);
    assert_eq!(state.view().current_id, Some(id(2)));

    let (state, _) = dismiss_ok(state, 2);
    assert_eq!(state.view().current_id, Some(id(3)));

    let (state, _) = dismiss_ok(state, 3);
    assert_eq!(state.view().current_id, Some(id(1)));
}

#[test]
fn undo_with_empty_history_is_an_info_notice() {
    init_logging();
    let (state, effects) = update(loaded(vec![item(1, 0.2)]), Msg::UndoRequested);

    assert_eq!(effects, vec![Effect::Notify(Notice::info("Nothing to undo"))]);
    assert_eq!(ids(&state), vec![id(1)]);
}

#[test]
fn failed_restore_keeps_action_undoable() {
    init_logging();
    let state = loaded(vec![item(1, 0.3), item(2, 0.3)]);
    let (state, _) = dismiss_ok(state, 1);

    let (state, _) = update(state, Msg::UndoRequested);
    assert!(state.history().is_empty());
    let (state, effects) = update(
        state,
        Msg::RestoreCompleted {
            id: id(1),
            result: Err(BackendFailure::Rejected {
                status: Some(404),
                message: "Screenshot not found".into(),
            }),
        },
    );

    assert_eq!(ids(&state), vec![id(2)]);
    assert_eq!(state.history().len(), 1);
    assert_eq!(
        effects,
        vec![Effect::Notify(Notice::error("Failed to undo dismiss action"))]
    );

    let (_, effects) = update(state, Msg::UndoRequested);
    assert_eq!(effects, vec![Effect::Restore { id: id(1) }]);
}

#[test]
fn only_one_undo_restore_runs_at_a_time() {
    init_logging();
    let state = loaded(vec![item(1, 0.3), item(2, 0.3), item(3, 0.3)]);
    let (state, _) = dismiss_ok(state, 1);
    let (state, _) = dismiss_ok(state, 2);

    let (state, first) = update(state, Msg::UndoRequested);
    let (state, second) = update(state, Msg::UndoRequested);

    assert_eq!(first, vec![Effect::Restore { id: id(2) }]);
    assert!(second.is_empty());
    assert_eq!(state.history().len(), 1);
}

#[test]
fn restore_does_not_duplicate_item_reloaded_meanwhile() {
    init_logging();
    let state = loaded(vec![item(1, 0.3), item(2, 0.3)]);
    let (state, _) = dismiss_ok(state, 1);
    let (state, _) = update(state, Msg::UndoRequested);

    let (state, effects) = update(state, Msg::LoadRequested);
    assert_eq!(effects, vec![Effect::FetchItems { request: 2 }]);
    let (state, _) = update(
        state,
        Msg::ItemsLoaded {
            request: 2,
            result: Ok(vec![item(2, 0.3), item(1, 0.3)]),
            fetched_at: Utc::now(),
        },
    );
    let (state, _) = update(
        state,
        Msg::RestoreCompleted {
            id: id(1),
            result: Ok(()),
        },
    );

    assert_eq!(ids(&state), vec![id(2), id(1)]);
}
