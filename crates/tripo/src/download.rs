//! Streaming a result file to disk.
//!
//! Bytes are written to a hidden `.part` file next to the destination
//! and renamed into place once the body is complete, so the destination
//! never holds a partial model.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

use crate::api::{ApiError, TripoApi};
use crate::events::{JobEvent, DOWNLOAD_PROGRESS_STEP};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] ApiError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("connection closed after {received} of {expected} bytes")]
    Truncated { received: u64, expected: u64 },
}

impl DownloadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Sibling temp path: `dir/.name.<uuid>.part`.
pub fn part_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    destination.with_file_name(format!(".{name}.{}.part", uuid::Uuid::new_v4()))
}

/// Download `url` to `destination`, replacing any existing file.
///
/// Returns the number of bytes written. On any failure the partial file
/// is removed and `destination` is left as it was.
pub async fn save_to(
    api: &TripoApi,
    url: &str,
    destination: &Path,
    events: Option<&broadcast::Sender<JobEvent>>,
) -> Result<u64, DownloadError> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }

    let response = api.fetch(url).await?;
    let part = part_path(destination);

    let result = stream_to(response, &part, destination, events).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&part).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %part.display(), error = %e, "Failed to remove partial download");
            }
        }
    }
    result
}

async fn stream_to(
    mut response: reqwest::Response,
    part: &Path,
    destination: &Path,
    events: Option<&broadcast::Sender<JobEvent>>,
) -> Result<u64, DownloadError> {
    let total = response.content_length();
    let mut file = tokio::fs::File::create(part)
        .await
        .map_err(|e| DownloadError::io(part, e))?;

    let mut written: u64 = 0;
    let mut reported: u64 = 0;

    while let Some(chunk) = response.chunk().await.map_err(ApiError::from)? {
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(part, e))?;
        written += chunk.len() as u64;

        if written - reported >= DOWNLOAD_PROGRESS_STEP {
            reported = written;
            if let Some(tx) = events {
                let _ = tx.send(JobEvent::DownloadProgress { bytes: written, total });
            }
        }
    }

    if let Some(expected) = total {
        if written < expected {
            return Err(DownloadError::Truncated {
                received: written,
                expected,
            });
        }
    }

    file.flush().await.map_err(|e| DownloadError::io(part, e))?;
    file.sync_all().await.map_err(|e| DownloadError::io(part, e))?;
    drop(file);

    tokio::fs::rename(part, destination)
        .await
        .map_err(|e| DownloadError::io(destination, e))?;

    tracing::info!(path = %destination.display(), bytes = written, "Model saved");
    if let Some(tx) = events {
        let _ = tx.send(JobEvent::DownloadProgress { bytes: written, total });
        let _ = tx.send(JobEvent::Saved {
            path: destination.to_path_buf(),
            bytes: written,
        });
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_file_is_hidden_sibling() {
        let part = part_path(Path::new("/tmp/out/barrel.glb"));
        assert_eq!(part.parent(), Some(Path::new("/tmp/out")));
        let name = part.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".barrel.glb."));
        assert!(name.ends_with(".part"));
    }

    #[test]
    fn part_paths_are_unique() {
        let dest = Path::new("model.glb");
        assert_ne!(part_path(dest), part_path(dest));
    }
}
