//! REST API client for the Tripo OpenAPI endpoints.
//!
//! Wraps image upload, task creation, task status, balance lookup and
//! result fetching using [`reqwest`]. Every request carries the bearer
//! token from [`Credentials`].

use async_trait::async_trait;
use meshgen_core::{Credentials, OutputFormat};
use serde::de::DeserializeOwned;

use crate::job::{JobHandle, JobStatus};
use crate::poller::StatusSource;
use crate::wire::{Balance, Envelope, TaskCreated, TaskData, TaskRequest, UploadData};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.tripo3d.ai/v2/openapi";

/// HTTP client for the Tripo service.
#[derive(Debug, Clone)]
pub struct TripoApi {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Tripo API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose envelope carried a non-zero code.
    #[error("Tripo rejected the request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// The body was not the JSON shape the endpoint promises.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether repeating the same request may succeed.
    ///
    /// True for transport failures, malformed bodies, HTTP 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => !e.is_builder(),
            Self::Malformed(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Rejected { .. } => false,
        }
    }

    /// HTTP status code, when the service answered with one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl TripoApi {
    /// Create a client for the production endpoint.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_client(reqwest::Client::new(), DEFAULT_BASE_URL.to_string(), credentials)
    }

    /// Create a client reusing an existing [`reqwest::Client`] against a
    /// custom API root (trailing slashes are dropped).
    pub fn with_client(client: reqwest::Client, base_url: String, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Upload one image and return the token that task requests refer to.
    ///
    /// Sends a `POST /upload` multipart request with the bytes in the
    /// `file` part.
    pub async fn upload_image(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.credentials.bearer_header())
            .multipart(form)
            .send()
            .await?;

        let data: UploadData = Self::parse_envelope(response).await?;
        Ok(data.image_token)
    }

    /// Create a generation task.
    ///
    /// Sends `POST /task?format=<fmt>` with the tagged request body and
    /// returns the server-assigned task id.
    pub async fn create_task(
        &self,
        request: &TaskRequest,
        format: OutputFormat,
    ) -> Result<String, ApiError> {
        let response = self
            .client
            .post(format!("{}/task", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.credentials.bearer_header())
            .query(&[("format", format.as_str())])
            .json(request)
            .send()
            .await?;

        let data: TaskCreated = Self::parse_envelope(response).await?;
        Ok(data.task_id)
    }

    /// Fetch the current state of a task via `GET /task/{task_id}`.
    pub async fn get_task(&self, task_id: &str) -> Result<TaskData, ApiError> {
        let response = self
            .client
            .get(format!("{}/task/{}", self.base_url, task_id))
            .header(reqwest::header::AUTHORIZATION, self.credentials.bearer_header())
            .send()
            .await?;

        Self::parse_envelope(response).await
    }

    /// Remaining account credits via `GET /user/balance`.
    pub async fn get_balance(&self) -> Result<Balance, ApiError> {
        let response = self
            .client
            .get(format!("{}/user/balance", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.credentials.bearer_header())
            .send()
            .await?;

        Self::parse_envelope(response).await
    }

    /// Start a GET for a result file and return the response once its
    /// status is known to be successful.
    ///
    /// The bearer token is only attached when `url` lives under the API
    /// root (see [`is_under_base`]); result links usually point at a CDN.
    pub async fn fetch(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        let mut request = self.client.get(url);
        if is_under_base(&self.base_url, url) {
            request = request.header(reqwest::header::AUTHORIZATION, self.credentials.bearer_header());
        }

        let response = request.send().await?;
        Self::ensure_success(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Read a successful response and unwrap its envelope.
    async fn parse_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        unwrap_envelope(&text)
    }
}

#[async_trait]
impl StatusSource for TripoApi {
    async fn fetch_status(&self, handle: &JobHandle) -> Result<JobStatus, ApiError> {
        let task = self.get_task(handle.as_str()).await?;
        JobStatus::from_task(handle.clone(), task)
    }
}

/// Whether `url` has the same scheme, host and port as `base` and a path
/// at or below the base path on a segment boundary.
///
/// Unparseable input never matches.
pub fn is_under_base(base: &str, url: &str) -> bool {
    let (Ok(base), Ok(url)) = (reqwest::Url::parse(base), reqwest::Url::parse(url)) else {
        return false;
    };

    if base.scheme() != url.scheme()
        || base.host_str() != url.host_str()
        || base.port_or_known_default() != url.port_or_known_default()
    {
        return false;
    }

    let root = base.path().trim_end_matches('/');
    match url.path().strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Decode an envelope body into its `data`, mapping a non-zero code to
/// [`ApiError::Rejected`].
pub fn unwrap_envelope<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let envelope: Envelope<T> =
        serde_json::from_str(text).map_err(|e| ApiError::Malformed(e.to_string()))?;

    if envelope.code != 0 {
        return Err(ApiError::Rejected {
            code: envelope.code,
            message: envelope.message.unwrap_or_else(|| "no message".to_string()),
        });
    }

    envelope
        .data
        .ok_or_else(|| ApiError::Malformed("envelope has no data".to_string()))
}
