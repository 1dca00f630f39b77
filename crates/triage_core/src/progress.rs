use std::time::Duration;

/// One poll result from the ingestion progress endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadProgress {
    pub processed: u32,
    /// Zero means the backend does not know the batch size yet.
    pub total: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEstimate {
    pub percent: u8,
    pub remaining: Option<Duration>,
}

/// Percent complete plus a linear time-remaining extrapolation
/// (`elapsed / processed * (total - processed)`).
///
/// Returns `None` while the total is unknown.
pub fn estimate(progress: UploadProgress, elapsed: Duration) -> Option<ProgressEstimate> {
    if progress.total == 0 {
        return None;
    }
    let processed = progress.processed.min(progress.total);
    let ratio = f64::from(processed) / f64::from(progress.total);
    let percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;

    let remaining = if processed > 0 {
        let per_item = elapsed.as_secs_f64() / f64::from(processed);
        let left = f64::from(progress.total - processed);
        Some(Duration::from_secs_f64(per_item * left))
    } else {
        None
    };

    Some(ProgressEstimate { percent, remaining })
}

/// Human text for a remaining-time estimate; `None` once nothing is left.
pub fn format_remaining(remaining: Duration) -> Option<String> {
    let seconds = remaining.as_secs_f64().round() as u64;
    if seconds == 0 {
        return None;
    }
    if seconds > 60 {
        Some(format!("{} min {} sec remaining", seconds / 60, seconds % 60))
    } else {
        Some(format!("{seconds} seconds remaining"))
    }
}
