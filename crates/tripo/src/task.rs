//! Running a generation in the background.
//!
//! [`GenerationTask::spawn`] drives [`JobClient::submit`] and
//! [`JobClient::finish`] on a tokio task so a front end stays responsive.
//! Completion is observed by awaiting [`GenerationTask::join`]; progress
//! by subscribing to the client's events.

use std::path::PathBuf;
use std::sync::Arc;

use meshgen_core::JobSpec;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{GenerationOutcome, JobClient};
use crate::error::JobError;
use crate::poller::PollConfig;

pub struct GenerationTask {
    cancel: CancellationToken,
    join_handle: JoinHandle<Result<GenerationOutcome, JobError>>,
}

impl GenerationTask {
    /// Start generating `spec` into `destination`.
    pub fn spawn(
        client: Arc<JobClient>,
        spec: JobSpec,
        destination: PathBuf,
        config: PollConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let join_handle = tokio::spawn(async move {
            let handle = tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Generation cancelled before submission finished");
                    return Err(JobError::Cancelled { handle: None });
                }
                result = client.submit(&spec) => result?,
            };

            tokio::select! {
                _ = token.cancelled() => {
                    tracing::warn!(
                        task_id = %handle,
                        "Stopped waiting; the remote task keeps running and consuming credits",
                    );
                    Err(JobError::Cancelled { handle: Some(handle.clone()) })
                }
                result = client.finish(&handle, &destination, &config) => result,
            }
        });

        Self {
            cancel,
            join_handle,
        }
    }

    /// Stop waiting. The remote job is not cancelled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to end.
    pub async fn join(self) -> Result<GenerationOutcome, JobError> {
        match self.join_handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Only reachable if the runtime is shutting down.
            Err(_) => Err(JobError::Cancelled { handle: None }),
        }
    }
}
