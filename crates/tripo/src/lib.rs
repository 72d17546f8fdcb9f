//! Job client for the Tripo 3D generation API.
//!
//! Submits image, multiview and text generation tasks, polls them at a
//! fixed interval until they finish and streams the resulting model to
//! disk.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::time::Duration;
//! use meshgen_core::{Credentials, JobSpec, OutputFormat};
//! use meshgen_tripo::JobClient;
//!
//! let client = JobClient::new(Credentials::from_env()?);
//! let handle = client.submit(&JobSpec::text("a wooden barrel", OutputFormat::Glb)).await?;
//! let status = client
//!     .await_completion(&handle, Duration::from_secs(3), Duration::from_secs(600))
//!     .await?;
//! if let Some(url) = status.result_url.as_deref() {
//!     client.download(url, "barrel.glb".as_ref()).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod download;
pub mod error;
pub mod events;
pub mod job;
pub mod poller;
pub mod task;
pub mod wire;

pub use api::{ApiError, TripoApi, DEFAULT_BASE_URL};
pub use client::{GenerationOutcome, JobClient};
pub use download::DownloadError;
pub use error::JobError;
pub use events::JobEvent;
pub use job::{JobHandle, JobStatus, LifecycleState};
pub use poller::{PollConfig, StatusSource};
pub use task::GenerationTask;
pub use wire::Balance;
