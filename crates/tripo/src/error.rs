use std::path::PathBuf;
use std::time::Duration;

use meshgen_core::ValidationError;

use crate::api::ApiError;
use crate::download::DownloadError;
use crate::job::{JobHandle, JobStatus};

/// Everything that can go wrong while driving a job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Rejected locally; nothing was sent.
    #[error("invalid job: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to read image {}: {source}", .path.display())]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Upload, task creation or balance lookup was refused.
    #[error("submission failed: {0}")]
    Submission(#[source] ApiError),

    /// Polling gave up after `attempts` tries.
    #[error("polling task {handle} failed after {attempts} attempt(s): {source}")]
    Poll {
        handle: JobHandle,
        attempts: u32,
        #[source]
        source: ApiError,
    },

    #[error("task {handle} did not finish within {}s", .waited.as_secs())]
    Timeout {
        handle: JobHandle,
        waited: Duration,
        /// Last status observed before giving up.
        last: Option<JobStatus>,
    },

    #[error("task {} failed: {}", .status.handle, .status.error.as_deref().unwrap_or("no reason given"))]
    JobFailed { status: JobStatus },

    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    /// The local wait was cancelled. The remote job is not.
    #[error("cancelled{}", .handle.as_ref().map(|h| format!(" while waiting for task {h}")).unwrap_or_default())]
    Cancelled { handle: Option<JobHandle> },
}

impl JobError {
    /// HTTP status code behind the error, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Submission(e) | Self::Poll { source: e, .. } => e.status_code(),
            Self::Download(DownloadError::Fetch(e)) => e.status_code(),
            _ => None,
        }
    }
}
