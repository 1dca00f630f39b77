use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use triage_core::ClientFlags;
use triage_engine::{read_optional, write_atomic};
use triage_logging::{triage_error, triage_info, triage_warn};

const STATE_FILENAME: &str = ".triage_state.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
struct PersistedFlags {
    had_screenshots: bool,
    hint_shown_count: u32,
}

fn state_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILENAME)
}

/// Missing or unreadable state falls back to first-run flags.
pub(crate) fn load_client_flags(state_dir: &Path) -> ClientFlags {
    let path = state_path(state_dir);
    let content = match read_optional(&path) {
        Ok(Some(text)) => text,
        Ok(None) => return ClientFlags::default(),
        Err(err) => {
            triage_warn!("Failed to read client state from {:?}: {}", path, err);
            return ClientFlags::default();
        }
    };

    match ron::from_str::<PersistedFlags>(&content) {
        Ok(flags) => {
            triage_info!("Loaded client state from {:?}", path);
            ClientFlags {
                had_items: flags.had_screenshots,
                hint_shown_count: flags.hint_shown_count,
            }
        }
        Err(err) => {
            triage_warn!("Failed to parse client state from {:?}: {}", path, err);
            ClientFlags::default()
        }
    }
}

pub(crate) fn save_client_flags(state_dir: &Path, flags: ClientFlags) {
    let persisted = PersistedFlags {
        had_screenshots: flags.had_items,
        hint_shown_count: flags.hint_shown_count,
    };

    let content = match ron::ser::to_string_pretty(&persisted, ron::ser::PrettyConfig::new()) {
        Ok(text) => text,
        Err(err) => {
            triage_error!("Failed to serialize client state: {}", err);
            return;
        }
    };

    let path = state_path(state_dir);
    if let Err(err) = write_atomic(&path, &content) {
        triage_error!("Failed to write client state to {:?}: {}", path, err);
    }
}
