//! Terminal output for job events.

use std::io::Write;

use meshgen_tripo::{JobEvent, LifecycleState};
use tokio::sync::broadcast;

/// One human-readable line per event worth showing.
pub fn render(event: &JobEvent) -> Option<String> {
    match event {
        JobEvent::Submitted { handle, mode } => Some(format!("Task submitted ({mode}): {handle}")),
        JobEvent::Progress { state: LifecycleState::Queued, .. } => Some("Queued".to_string()),
        JobEvent::Progress { state: LifecycleState::Running, percent, .. } => {
            let pct = percent.unwrap_or(0);
            Some(format!("[{}] {pct:>3}%", bar(pct)))
        }
        // Terminal states are reported through Completed/Failed.
        JobEvent::Progress { .. } => None,
        JobEvent::Completed { .. } => Some(format!("[{}] 100%  done", bar(100))),
        JobEvent::Failed { error, .. } => Some(format!("Task failed: {error}")),
        JobEvent::DownloadProgress { bytes, total: Some(total) } if *total > 0 => Some(format!(
            "Downloading {:.1} / {:.1} MB",
            mib(*bytes),
            mib(*total)
        )),
        JobEvent::DownloadProgress { bytes, .. } => Some(format!("Downloading {:.1} MB", mib(*bytes))),
        JobEvent::Saved { path, bytes } => Some(format!("Saved: {} ({:.1} MB)", path.display(), mib(*bytes))),
    }
}

/// Print events until the channel closes.
pub async fn report(rx: broadcast::Receiver<JobEvent>) {
    report_to(rx, std::io::stdout()).await;
}

/// Write events to `out` until every sender is gone. Events still queued
/// when the last sender drops are written before returning.
pub async fn report_to(mut rx: broadcast::Receiver<JobEvent>, mut out: impl Write) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(line) = render(&event) {
                    if let Err(e) = writeln!(out, "{line}") {
                        tracing::debug!(error = %e, "Progress output closed");
                        return;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress display fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * 30 / 100;
    format!("{}{}", "#".repeat(filled), "-".repeat(30 - filled))
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
