use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use triage_core::CoreSettings;
use triage_engine::{read_optional, BackendSettings, IngestSettings};

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "triage.ron";
pub const BASE_URL_ENV: &str = "TRIAGE_BASE_URL";

/// Settings read from `triage.ron`; every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Where `.triage_state.ron` lives.
    pub state_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub max_poll_failures: u32,
    pub defer_cooldown_ms: u64,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        let backend = BackendSettings::default();
        let ingest = IngestSettings::default();
        let core = CoreSettings::default();
        Self {
            base_url: backend.base_url,
            state_dir: PathBuf::from("."),
            poll_interval_ms: duration_ms(ingest.poll_interval),
            max_poll_failures: ingest.max_poll_failures,
            defer_cooldown_ms: duration_ms(core.defer_cooldown),
            log_destination: LogDestination::default(),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let Some(content) =
            read_optional(path).with_context(|| format!("reading {}", path.display()))?
        else {
            return Ok(Self::default());
        };
        ron::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.base_url = base_url.trim().to_string();
        }
        self
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            base_url: self.base_url.clone(),
            ..BackendSettings::default()
        }
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            max_poll_failures: self.max_poll_failures.max(1),
        }
    }

    pub fn core_settings(&self) -> CoreSettings {
        CoreSettings {
            defer_cooldown: Duration::from_millis(self.defer_cooldown_ms),
            ..CoreSettings::default()
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
