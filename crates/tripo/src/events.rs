//! Events emitted while a job is driven.
//!
//! Published on a [`tokio::sync::broadcast`] channel owned by
//! [`JobClient`](crate::JobClient). Sends never block; a receiver that
//! falls behind sees `RecvError::Lagged` and skips ahead.

use std::path::PathBuf;

use meshgen_core::GenerationMode;
use serde::Serialize;

use crate::job::{JobHandle, LifecycleState};

/// Capacity of the per-client event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Bytes received between two [`JobEvent::DownloadProgress`] events.
pub const DOWNLOAD_PROGRESS_STEP: u64 = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JobEvent {
    /// The service accepted a task.
    Submitted { handle: JobHandle, mode: GenerationMode },

    /// A poll observed a state or percentage different from the last one.
    Progress {
        handle: JobHandle,
        state: LifecycleState,
        /// Completion percentage (0-100).
        percent: Option<u8>,
    },

    Completed { handle: JobHandle, result_url: String },

    Failed { handle: JobHandle, error: String },

    /// Result bytes written so far. `total` comes from `Content-Length`.
    DownloadProgress { bytes: u64, total: Option<u64> },

    /// The model file is in place at `path`.
    Saved { path: PathBuf, bytes: u64 },
}
