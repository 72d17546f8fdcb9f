//! Remote job identity and the status snapshot observed by polling.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::wire::TaskData;

/// Opaque identifier the service assigns to a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle of a remote job: `Queued -> Running -> {Succeeded | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl LifecycleState {
    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job at one poll.
///
/// `result_url` is only set when `state` is [`LifecycleState::Succeeded`]
/// and `error` only when it is [`LifecycleState::Failed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub handle: JobHandle,
    pub state: LifecycleState,
    /// Completion percentage (0-100), when the service reports one.
    pub progress: Option<u8>,
    pub result_url: Option<String>,
    pub error: Option<String>,
}

impl JobStatus {
    /// Translate a `GET /task/{id}` payload.
    ///
    /// Remote statuses other than `queued`, `running` and `success` all
    /// map to [`LifecycleState::Failed`]. A `success` without any model
    /// link is reported as [`ApiError::Malformed`].
    pub fn from_task(handle: JobHandle, task: TaskData) -> Result<Self, ApiError> {
        let progress = task.progress.map(clamp_progress);

        let status = match task.status.as_str() {
            "queued" => Self::pending(handle, LifecycleState::Queued, progress),
            "running" => Self::pending(handle, LifecycleState::Running, progress),
            "success" => {
                let url = task.model_url().map(str::to_string).ok_or_else(|| {
                    ApiError::Malformed(format!("task {handle} succeeded without a model URL"))
                })?;
                Self {
                    handle,
                    state: LifecycleState::Succeeded,
                    progress: Some(100),
                    result_url: Some(url),
                    error: None,
                }
            }
            other => {
                let error = match task.message.as_deref().filter(|m| !m.trim().is_empty()) {
                    Some(msg) => format!("remote status '{other}': {msg}"),
                    None => format!("remote status '{other}'"),
                };
                Self {
                    handle,
                    state: LifecycleState::Failed,
                    progress,
                    result_url: None,
                    error: Some(error),
                }
            }
        };

        Ok(status)
    }

    fn pending(handle: JobHandle, state: LifecycleState, progress: Option<u8>) -> Self {
        Self {
            handle,
            state,
            progress,
            result_url: None,
            error: None,
        }
    }
}

fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        0
    } else {
        raw.round().clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::TaskOutput;
    use assert_matches::assert_matches;

    fn task(status: &str) -> TaskData {
        TaskData {
            task_id: "job-1".into(),
            status: status.into(),
            progress: None,
            message: None,
            output: None,
        }
    }

    #[test]
    fn queued_and_running_are_not_terminal() {
        let s = JobStatus::from_task("job-1".into(), task("queued")).unwrap();
        assert_eq!(s.state, LifecycleState::Queued);
        assert!(!s.state.is_terminal());

        let mut running = task("running");
        running.progress = Some(37.4);
        let s = JobStatus::from_task("job-1".into(), running).unwrap();
        assert_eq!(s.state, LifecycleState::Running);
        assert_eq!(s.progress, Some(37));
        assert!(s.result_url.is_none());
    }

    #[test]
    fn success_carries_result_url() {
        let mut done = task("success");
        done.output = Some(TaskOutput {
            model: None,
            pbr_model: Some("https://cdn/pbr.glb".into()),
            base_model: None,
        });
        let s = JobStatus::from_task("job-1".into(), done).unwrap();
        assert_eq!(s.state, LifecycleState::Succeeded);
        assert_eq!(s.result_url.as_deref(), Some("https://cdn/pbr.glb"));
        assert!(s.error.is_none());
    }

    #[test]
    fn success_without_url_is_malformed() {
        let err = JobStatus::from_task("job-1".into(), task("success")).unwrap_err();
        assert_matches!(err, ApiError::Malformed(_));
    }

    #[test]
    fn unrecognised_statuses_fail() {
        for remote in ["failed", "cancelled", "banned", "expired", "unknown", "exploded"] {
            let s = JobStatus::from_task("job-1".into(), task(remote)).unwrap();
            assert_eq!(s.state, LifecycleState::Failed, "{remote}");
            assert!(s.error.as_deref().unwrap().contains(remote));
        }
    }

    #[test]
    fn failure_message_is_kept() {
        let mut failed = task("failed");
        failed.message = Some("content policy".into());
        let s = JobStatus::from_task("job-1".into(), failed).unwrap();
        assert_eq!(s.error.as_deref(), Some("remote status 'failed': content policy"));
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(clamp_progress(-5.0), 0);
        assert_eq!(clamp_progress(140.0), 100);
        assert_eq!(clamp_progress(f64::NAN), 0);
    }
}
