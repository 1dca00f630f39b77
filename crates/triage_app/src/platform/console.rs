use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use triage_core::{AppViewModel, Confirmation, DeferPosition, ItemId, Msg, TriggerSource};
use triage_logging::triage_debug;

pub const HELP_TEXT: &str = "\
Keys:      e dismiss | h move to end | z undo
Words:     dismiss [id] | defer [id] | next | prev | reload
Bulk:      clear | restore | cleanup
Ingestion: upload <file..> | stop
Other:     help | quit";

/// Everything the main loop reacts to.
#[derive(Debug)]
pub(crate) enum Input {
    Line(String),
    Msg(Msg),
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Send(Msg),
    /// Answer locally without touching the state.
    Reply(String),
    Help,
    Quit,
}

pub(crate) fn spawn_stdin_reader(tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Input::Closed);
    });
}

/// Single letters are keyboard shortcuts; spelled-out verbs count as pointer clicks.
pub(crate) fn parse(line: &str, view: &AppViewModel, now: Instant) -> Command {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Command::Send(Msg::NoOp);
    };
    let verb = verb.to_ascii_lowercase();

    if let Some(pending) = view.awaiting_confirmation {
        let accepted = matches!(verb.as_str(), "y" | "yes");
        triage_debug!("confirmation {pending:?} answered {accepted}");
        return Command::Send(match (pending, accepted) {
            (Confirmation::ClearAll, true) => Msg::ClearAllConfirmed,
            (Confirmation::Cleanup, true) => Msg::CleanupConfirmed,
            (_, false) => Msg::ConfirmationDeclined,
        });
    }

    let explicit_id = words.clone().next().map(ItemId::from);
    match verb.as_str() {
        "e" => target(view.current_id.clone(), |id| Msg::DismissRequested { id }),
        "h" => target(view.current_id.clone(), |id| defer(id, TriggerSource::Keyboard, now)),
        "z" | "undo" => Command::Send(Msg::UndoRequested),
        "dismiss" => target(explicit_id.or_else(|| view.current_id.clone()), |id| {
            Msg::DismissRequested { id }
        }),
        "defer" => target(explicit_id.or_else(|| view.current_id.clone()), |id| {
            defer(id, TriggerSource::Pointer, now)
        }),
        "n" | "next" => Command::Send(Msg::NavigateNext),
        "p" | "prev" => Command::Send(Msg::NavigatePrevious),
        "clear" => Command::Send(Msg::ClearAllRequested),
        "restore" => Command::Send(Msg::RestoreAllRequested),
        "cleanup" => Command::Send(Msg::CleanupRequested),
        "upload" => Command::Send(Msg::UploadRequested {
            files: words.map(PathBuf::from).collect(),
        }),
        "stop" => Command::Send(Msg::StopUploadRequested),
        "r" | "reload" => Command::Send(Msg::LoadRequested),
        "?" | "help" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        other => Command::Reply(format!("Unknown command `{other}`. Type `help`.")),
    }
}

fn target(id: Option<ItemId>, build: impl FnOnce(ItemId) -> Msg) -> Command {
    match id {
        Some(id) => Command::Send(build(id)),
        None => Command::Reply("No screenshot selected.".to_string()),
    }
}

fn defer(id: ItemId, source: TriggerSource, at: Instant) -> Msg {
    Msg::DeferRequested {
        id,
        position: DeferPosition::End,
        source,
        at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_with_current(id: &str) -> AppViewModel {
        AppViewModel {
            current: Some(0),
            current_id: Some(ItemId::from(id)),
            ..AppViewModel::default()
        }
    }

    #[test]
    fn keys_act_on_current_item() {
        let now = Instant::now();
        let view = view_with_current("7");

        assert_eq!(
            parse("e", &view, now),
            Command::Send(Msg::DismissRequested {
                id: ItemId::from("7")
            })
        );
        assert_eq!(
            parse("h", &view, now),
            Command::Send(Msg::DeferRequested {
                id: ItemId::from("7"),
                position: DeferPosition::End,
                source: TriggerSource::Keyboard,
                at: now,
            })
        );
    }

    #[test]
    fn defer_word_is_pointer_sourced_and_accepts_id() {
        let now = Instant::now();
        let view = view_with_current("7");

        assert_eq!(
            parse("defer 12", &view, now),
            Command::Send(Msg::DeferRequested {
                id: ItemId::from("12"),
                position: DeferPosition::End,
                source: TriggerSource::Pointer,
                at: now,
            })
        );
    }

    #[test]
    fn item_keys_without_selection_reply_locally() {
        let view = AppViewModel::default();
        assert!(matches!(
            parse("e", &view, Instant::now()),
            Command::Reply(_)
        ));
    }

    #[test]
    fn pending_confirmation_captures_answer() {
        let view = AppViewModel {
            awaiting_confirmation: Some(Confirmation::ClearAll),
            ..view_with_current("1")
        };

        assert_eq!(
            parse("Y", &view, Instant::now()),
            Command::Send(Msg::ClearAllConfirmed)
        );
        assert_eq!(
            parse("e", &view, Instant::now()),
            Command::Send(Msg::ConfirmationDeclined)
        );
    }

    #[test]
    fn upload_collects_paths() {
        let view = AppViewModel::default();
        assert_eq!(
            parse("upload a.png shots/b.jpg", &view, Instant::now()),
            Command::Send(Msg::UploadRequested {
                files: vec![PathBuf::from("a.png"), PathBuf::from("shots/b.jpg")],
            })
        );
        assert_eq!(
            parse("upload", &view, Instant::now()),
            Command::Send(Msg::UploadRequested { files: Vec::new() })
        );
    }

    #[test]
    fn blank_and_unknown_lines() {
        let view = AppViewModel::default();
        assert_eq!(parse("   ", &view, Instant::now()), Command::Send(Msg::NoOp));
        assert!(matches!(
            parse("frobnicate", &view, Instant::now()),
            Command::Reply(_)
        ));
        assert_eq!(parse("quit", &view, Instant::now()), Command::Quit);
    }
}
