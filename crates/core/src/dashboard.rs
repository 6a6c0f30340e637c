//! Synthetic dashboard time windows.
//!
//! Benchmark scripts report `started_at` / `ended_at` as decimal epoch
//! milliseconds. Dashboards are linked with a window of the same duration
//! anchored at the moment of reporting, preceded by a fixed lead-in.

use crate::types::EpochMillis;

/// Lead-in prepended to every synthetic window.
pub const WINDOW_LEAD_IN_MS: EpochMillis = 30_000;

/// A `[from, to]` range in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardWindow {
    pub from: EpochMillis,
    pub to: EpochMillis,
}

/// Derive the window `[now - duration - lead_in, now]` from the recorded
/// timestamps. Returns `None` when either value is missing, not numeric, or
/// so far apart that the window does not fit in an `i64`.
pub fn synthesize_window(
    started_at: Option<&str>,
    ended_at: Option<&str>,
    now_ms: EpochMillis,
) -> Option<DashboardWindow> {
    let started = started_at?.trim().parse::<EpochMillis>();
    let ended = ended_at?.trim().parse::<EpochMillis>();

    match (started, ended) {
        (Ok(started), Ok(ended)) => {
            let from = ended
                .checked_sub(started)
                .and_then(|duration| now_ms.checked_sub(duration))
                .and_then(|from| from.checked_sub(WINDOW_LEAD_IN_MS));
            if from.is_none() {
                tracing::warn!(started, ended, "Reported timestamps overflow the dashboard window");
            }
            from.map(|from| DashboardWindow { from, to: now_ms })
        }
        (started, ended) => {
            tracing::warn!(
                started_err = ?started.err(),
                ended_err = ?ended.err(),
                "Cannot convert started_at / ended_at to epoch millis"
            );
            None
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    chrono::Utc::now().timestamp_millis()
}

/// Compose the dashboard link for a run. An empty window leaves the `from`
/// and `to` parameters blank.
pub fn dashboard_url(base: &str, window: Option<&DashboardWindow>, run_name: &str) -> String {
    let (from, to) = window
        .map(|w| (w.from.to_string(), w.to.to_string()))
        .unwrap_or_default();
    format!("{base}&from={from}&to={to}&var-testrun={run_name}")
}

/// Link used before a run has produced timestamps.
pub fn pending_dashboard_url(base: &str, run_name: &str) -> String {
    format!("{base}&var-testrun={run_name}")
}
