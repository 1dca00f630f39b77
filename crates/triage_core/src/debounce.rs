use std::time::{Duration, Instant};

pub const DEFAULT_DEFER_COOLDOWN: Duration = Duration::from_millis(2000);

/// Where a trigger came from, as reported by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// Key press, possibly auto-repeated.
    Keyboard,
    /// Click or tap; always treated as deliberate.
    Pointer,
}

/// Rate limit for keyboard-driven defer-to-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceGuard {
    cooldown: Duration,
    last_accepted: Option<Instant>,
}

impl Default for DebounceGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DEFER_COOLDOWN)
    }
}

impl DebounceGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: None,
        }
    }

    /// Decide whether a trigger at `now` goes through. The window only moves on acceptance.
    pub fn admit(&mut self, source: TriggerSource, now: Instant) -> bool {
        if source == TriggerSource::Keyboard {
            if let Some(last) = self.last_accepted {
                if now.saturating_duration_since(last) < self.cooldown {
                    return false;
                }
            }
        }
        self.last_accepted = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
