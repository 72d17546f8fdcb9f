//! Tripo OpenAPI request and response bodies.
//!
//! Every JSON response is wrapped in an envelope of the shape
//! `{"code": 0, "message": "...", "data": {...}}` where a non-zero
//! `code` means the service refused the request. Task creation bodies
//! are internally tagged by `"type"`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Common wrapper around every JSON response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Payload of `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadData {
    pub image_token: String,
}

/// Payload of `POST /task`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskCreated {
    pub task_id: String,
}

/// Payload of `GET /task/{task_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskData {
    pub task_id: String,
    /// Remote lifecycle string (`queued`, `running`, `success`, ...).
    pub status: String,
    /// Completion percentage reported by the service.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub output: Option<TaskOutput>,
}

impl TaskData {
    /// Link to the generated model, if the task produced one.
    pub fn model_url(&self) -> Option<&str> {
        self.output.as_ref().and_then(TaskOutput::model_url)
    }
}

/// Download links attached to a finished task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskOutput {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub pbr_model: Option<String>,
    #[serde(default)]
    pub base_model: Option<String>,
}

impl TaskOutput {
    /// First non-empty link in preference order: `model`, `pbr_model`,
    /// `base_model`.
    pub fn model_url(&self) -> Option<&str> {
        [&self.model, &self.pbr_model, &self.base_model]
            .into_iter()
            .filter_map(|u| u.as_deref())
            .find(|u| !u.trim().is_empty())
    }
}

/// Account credit balance from `GET /user/balance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Credits available for new tasks.
    pub balance: f64,
    /// Credits held by tasks still in flight.
    #[serde(default)]
    pub frozen: f64,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Reference to an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    /// Image type, e.g. `png` or `jpg`.
    #[serde(rename = "type")]
    pub kind: String,
    pub file_token: String,
}

/// Body of `POST /task`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskRequest {
    ImageToModel {
        file: FileRef,
        #[serde(skip_serializing_if = "Option::is_none")]
        model_version: Option<String>,
    },
    MultiviewToModel {
        files: Vec<FileRef>,
        #[serde(skip_serializing_if = "Option::is_none")]
        model_version: Option<String>,
    },
    TextToModel {
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        model_version: Option<String>,
    },
}

impl TaskRequest {
    /// Remote task type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ImageToModel { .. } => "image_to_model",
            Self::MultiviewToModel { .. } => "multiview_to_model",
            Self::TextToModel { .. } => "text_to_model",
        }
    }
}
