//! Fixed-interval polling until a job reaches a terminal state.
//!
//! The loop polls, sleeps `interval`, and polls again until the job is
//! terminal or `timeout` has elapsed. Transient poll failures are
//! retried a bounded number of times with a fixed delay; there is no
//! exponential backoff. A poll still in flight at the deadline is
//! abandoned.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::api::ApiError;
use crate::error::JobError;
use crate::events::JobEvent;
use crate::job::{JobHandle, JobStatus, LifecycleState};

/// Default number of retries for a transient poll failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause before retrying a failed poll.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Anything that can report the current status of a job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, handle: &JobHandle) -> Result<JobStatus, ApiError>;
}

/// Polling parameters. Both `interval` and `timeout` are always chosen
/// by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between two successful polls.
    pub interval: Duration,
    /// Total time allowed for the job to reach a terminal state.
    pub timeout: Duration,
    /// Retries per poll for transient failures.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

/// Fetch one status, retrying transient failures up to
/// `config.max_retries` times.
///
/// Non-transient failures are returned on the first attempt.
pub async fn poll_with_retry<S>(
    source: &S,
    handle: &JobHandle,
    config: &PollConfig,
) -> Result<JobStatus, JobError>
where
    S: StatusSource + ?Sized,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match source.fetch_status(handle).await {
            Ok(status) => return Ok(status),
            Err(e) if e.is_transient() && attempt <= config.max_retries => {
                tracing::warn!(
                    task_id = %handle,
                    attempt,
                    error = %e,
                    "Poll failed, retrying",
                );
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(e) => {
                return Err(JobError::Poll {
                    handle: handle.clone(),
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}

/// Poll `handle` until it is terminal or `config.timeout` elapses.
///
/// Returns the terminal status, which may be [`LifecycleState::Failed`];
/// turning that into an error is up to the caller. Progress events are
/// published on `events` whenever the state or percentage changes.
pub async fn await_completion<S>(
    source: &S,
    handle: &JobHandle,
    config: &PollConfig,
    events: Option<&broadcast::Sender<JobEvent>>,
) -> Result<JobStatus, JobError>
where
    S: StatusSource + ?Sized,
{
    let started = Instant::now();
    let deadline = started + config.timeout;
    let mut last: Option<JobStatus> = None;
    let mut polls = 0u32;

    let timed_out = |last: Option<JobStatus>| {
        let waited = started.elapsed();
        tracing::warn!(
            task_id = %handle,
            waited_secs = waited.as_secs(),
            last_state = last.as_ref().map(|s| s.state.as_str()),
            "Timed out waiting for task",
        );
        JobError::Timeout {
            handle: handle.clone(),
            waited,
            last,
        }
    };

    loop {
        polls += 1;
        let status = match tokio::time::timeout_at(deadline, poll_with_retry(source, handle, config)).await {
            Ok(result) => result?,
            Err(_) => return Err(timed_out(last)),
        };

        let changed = last
            .as_ref()
            .map_or(true, |prev| prev.state != status.state || prev.progress != status.progress);
        if changed {
            tracing::debug!(
                task_id = %handle,
                polls,
                status = status.state.as_str(),
                progress = status.progress,
                "Task status changed",
            );
            publish(
                events,
                JobEvent::Progress {
                    handle: handle.clone(),
                    state: status.state,
                    percent: status.progress,
                },
            );
        }

        if status.state.is_terminal() {
            match (&status.state, &status.result_url, &status.error) {
                (LifecycleState::Succeeded, Some(url), _) => {
                    tracing::info!(task_id = %handle, polls, "Task succeeded");
                    publish(
                        events,
                        JobEvent::Completed {
                            handle: handle.clone(),
                            result_url: url.clone(),
                        },
                    );
                }
                (_, _, error) => {
                    let error = error.clone().unwrap_or_else(|| "unknown error".to_string());
                    tracing::warn!(task_id = %handle, polls, error = %error, "Task failed");
                    publish(
                        events,
                        JobEvent::Failed {
                            handle: handle.clone(),
                            error,
                        },
                    );
                }
            }
            return Ok(status);
        }

        last = Some(status);

        let next = (Instant::now() + config.interval).min(deadline);
        tokio::time::sleep_until(next).await;
        if Instant::now() >= deadline {
            return Err(timed_out(last));
        }
    }
}

fn publish(events: Option<&broadcast::Sender<JobEvent>>, event: JobEvent) {
    if let Some(tx) = events {
        // No subscribers is fine.
        let _ = tx.send(event);
    }
}
