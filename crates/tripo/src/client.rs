//! The job client: submit, poll, wait, download.
//!
//! [`JobClient`] owns a [`TripoApi`] and an event channel. It keeps no
//! per-job state; the [`JobHandle`] returned by [`JobClient::submit`] is
//! passed back explicitly to every later call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use meshgen_core::spec::image_extension;
use meshgen_core::{Credentials, GenerationMode, JobSpec};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::api::TripoApi;
use crate::download;
use crate::error::JobError;
use crate::events::{JobEvent, EVENT_CHANNEL_CAPACITY};
use crate::job::{JobHandle, JobStatus, LifecycleState};
use crate::poller::{self, PollConfig, StatusSource};
use crate::wire::{Balance, FileRef, TaskRequest};

/// Result of a full [`JobClient::generate`] run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub handle: JobHandle,
    /// Final (succeeded) status.
    pub status: JobStatus,
    pub path: PathBuf,
    pub bytes: u64,
    pub finished_at: DateTime<Utc>,
}

pub struct JobClient {
    api: TripoApi,
    event_tx: broadcast::Sender<JobEvent>,
}

impl JobClient {
    /// Client for the production endpoint.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_api(TripoApi::new(credentials))
    }

    pub fn with_api(api: TripoApi) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { api, event_tx }
    }

    pub fn api(&self) -> &TripoApi {
        &self.api
    }

    /// Subscribe to job events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    // ---- operations ----

    /// Validate `spec` and create the remote task.
    ///
    /// Validation happens before any request. Image modes upload every
    /// image first (in order) and then create the task from the returned
    /// tokens.
    pub async fn submit(&self, spec: &JobSpec) -> Result<JobHandle, JobError> {
        spec.validate()?;

        let model_version = spec.model_version.clone();
        let request = match spec.mode {
            GenerationMode::Text => TaskRequest::TextToModel {
                prompt: spec.prompt.clone().unwrap_or_default(),
                model_version,
            },
            GenerationMode::SingleImage => {
                let mut files = self.upload_images(&spec.images).await?;
                let file = files.remove(0);
                TaskRequest::ImageToModel { file, model_version }
            }
            GenerationMode::Multiview => TaskRequest::MultiviewToModel {
                files: self.upload_images(&spec.images).await?,
                model_version,
            },
        };

        let task_id = self
            .api
            .create_task(&request, spec.format)
            .await
            .map_err(JobError::Submission)?;
        let handle = JobHandle::from(task_id);

        tracing::info!(
            task_id = %handle,
            kind = request.kind(),
            format = %spec.format,
            "Task submitted",
        );
        let _ = self.event_tx.send(JobEvent::Submitted {
            handle: handle.clone(),
            mode: spec.mode,
        });

        Ok(handle)
    }

    /// One status request. Not retried.
    pub async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, JobError> {
        self.api
            .fetch_status(handle)
            .await
            .map_err(|source| JobError::Poll {
                handle: handle.clone(),
                attempts: 1,
                source,
            })
    }

    /// Poll every `poll_interval` until the job is terminal or `timeout`
    /// elapses, with the default retry policy.
    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<JobStatus, JobError> {
        self.await_with(handle, &PollConfig::new(poll_interval, timeout))
            .await
    }

    pub async fn await_with(
        &self,
        handle: &JobHandle,
        config: &PollConfig,
    ) -> Result<JobStatus, JobError> {
        poller::await_completion(&self.api, handle, config, Some(&self.event_tx)).await
    }

    /// Save the model at `result_url` to `destination`. Returns bytes
    /// written.
    pub async fn download(&self, result_url: &str, destination: &Path) -> Result<u64, JobError> {
        let bytes = download::save_to(&self.api, result_url, destination, Some(&self.event_tx)).await?;
        Ok(bytes)
    }

    /// Remaining account credits.
    pub async fn get_balance(&self) -> Result<Balance, JobError> {
        self.api.get_balance().await.map_err(JobError::Submission)
    }

    /// Wait for an already submitted job and download its result.
    ///
    /// A job that ends in [`LifecycleState::Failed`] is reported as
    /// [`JobError::JobFailed`].
    pub async fn finish(
        &self,
        handle: &JobHandle,
        destination: &Path,
        config: &PollConfig,
    ) -> Result<GenerationOutcome, JobError> {
        let status = self.await_with(handle, config).await?;

        let url = match (&status.state, status.result_url.as_deref()) {
            (LifecycleState::Succeeded, Some(url)) => url.to_string(),
            _ => return Err(JobError::JobFailed { status }),
        };

        let bytes = self.download(&url, destination).await?;

        Ok(GenerationOutcome {
            handle: handle.clone(),
            status,
            path: destination.to_path_buf(),
            bytes,
            finished_at: Utc::now(),
        })
    }

    /// Submit, wait and download in one call.
    pub async fn generate(
        &self,
        spec: &JobSpec,
        destination: &Path,
        config: &PollConfig,
    ) -> Result<GenerationOutcome, JobError> {
        let handle = self.submit(spec).await?;
        self.finish(&handle, destination, config).await
    }

    // ---- private helpers ----

    async fn upload_images(&self, images: &[PathBuf]) -> Result<Vec<FileRef>, JobError> {
        let mut files = Vec::with_capacity(images.len());

        for (index, path) in images.iter().enumerate() {
            let bytes = tokio::fs::read(path).await.map_err(|source| JobError::ReadImage {
                path: path.clone(),
                source,
            })?;

            let extension = image_extension(path).unwrap_or_default();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("image.{extension}"));

            tracing::debug!(
                image = %path.display(),
                index,
                bytes = bytes.len(),
                "Uploading image",
            );

            let token = self
                .api
                .upload_image(&file_name, mime_for(&extension), bytes)
                .await
                .map_err(JobError::Submission)?;

            files.push(FileRef {
                kind: file_type_for(&extension).to_string(),
                file_token: token,
            });
        }

        Ok(files)
    }
}

fn mime_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Image type name used in task requests.
fn file_type_for(extension: &str) -> &str {
    match extension {
        "jpeg" => "jpg",
        other => other,
    }
}
