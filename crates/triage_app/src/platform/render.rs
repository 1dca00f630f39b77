use triage_core::{AppViewModel, EmptyState, IngestionView, Notice, NoticeKind, PriorityTier};

pub const HINT_TEXT: &str = "Tip: press e to dismiss, h to move to the end, z to undo.";

const TEXT_PREVIEW_CHARS: usize = 160;

pub fn render(view: &AppViewModel) -> String {
    let mut lines = vec![format!("== {} ==", view.counter_text)];

    if let Some(ingestion) = &view.ingestion {
        lines.push(ingestion_line(ingestion));
    }

    match (view.current, view.empty_state) {
        (Some(index), _) => {
            if let Some(row) = view.items.get(index) {
                lines.push(format!(
                    "[{}/{}] {} ({} priority, {:.2})",
                    index + 1,
                    view.item_count,
                    row.filename,
                    tier_label(row.tier),
                    row.priority_score
                ));
                lines.push(format!(
                    "    added {}  id {}",
                    row.created_at.format("%Y-%m-%d %H:%M"),
                    row.id
                ));
                if let Some(text) = row.text_content.as_deref().map(str::trim) {
                    if !text.is_empty() {
                        lines.push(format!("    {}", preview(text)));
                    }
                }
                if view.pending_ids.contains(&row.id) {
                    lines.push("    (saving...)".to_string());
                }
            }
        }
        (None, Some(EmptyState::Checking)) => lines.push("Checking...".to_string()),
        (None, Some(EmptyState::AllDone)) => {
            lines.push("All done! Every screenshot has been reviewed.".to_string());
            lines.push("Type `restore` to bring dismissed screenshots back.".to_string());
        }
        (None, Some(EmptyState::NoItems)) => {
            lines.push("No screenshots yet. Type `upload <files..>` to add some.".to_string());
        }
        (None, None) => lines.push("Loading...".to_string()),
    }

    if view.show_hint && view.current.is_some() {
        lines.push(HINT_TEXT.to_string());
    }
    if view.busy {
        lines.push("Working...".to_string());
    }

    lines.join("\n")
}

pub fn notice_line(notice: &Notice) -> String {
    let tag = match notice.kind {
        NoticeKind::Success => "ok",
        NoticeKind::Info => "info",
        NoticeKind::Validation => "input",
        NoticeKind::Warning => "warn",
        NoticeKind::Error => "error",
    };
    format!("[{tag}] {}", notice.message)
}

pub fn clear_all_prompt(count: usize) -> String {
    let noun = if count == 1 { "screenshot" } else { "screenshots" };
    format!("Dismiss all {count} {noun}? You can restore them later. [y/n]")
}

pub fn cleanup_prompt() -> String {
    "Clear all session data? This removes every screenshot and cannot be undone. [y/n]"
        .to_string()
}

fn ingestion_line(ingestion: &IngestionView) -> String {
    if ingestion.submitting {
        return format!("Uploading {} file(s)...", ingestion.total);
    }
    let mut line = format!(
        "Processing {}/{} ({}%)",
        ingestion.processed, ingestion.total, ingestion.percent
    );
    if let Some(remaining) = &ingestion.remaining_text {
        line.push_str(" - ");
        line.push_str(remaining);
    }
    line
}

fn tier_label(tier: PriorityTier) -> &'static str {
    match tier {
        PriorityTier::High => "high",
        PriorityTier::Medium => "medium",
        PriorityTier::Low => "low",
    }
}

fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= TEXT_PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(TEXT_PREVIEW_CHARS).collect();
    format!("{cut}...")
}
