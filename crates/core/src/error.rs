use std::path::PathBuf;

use crate::spec::GenerationMode;

/// A job specification (or a value feeding one) was rejected before any
/// request left the process.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{mode} mode takes {expected} image(s), got {got}")]
    ImageCount {
        mode: GenerationMode,
        expected: &'static str,
        got: usize,
    },

    #[error("{0} mode does not take a prompt")]
    PromptNotAllowed(GenerationMode),

    #[error("text mode requires a prompt")]
    MissingPrompt,

    #[error("prompt must not be blank")]
    BlankPrompt,

    #[error("image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("image is not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("unsupported image type '{extension}' for {}; expected one of: {allowed}", .path.display())]
    UnsupportedImageType {
        path: PathBuf,
        extension: String,
        allowed: String,
    },

    #[error("image {} is {size} bytes, limit is {limit}", .path.display())]
    ImageTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("model version must not be blank")]
    BlankModelVersion,

    #[error("API token must not be blank")]
    BlankToken,

    #[error("no API token: set {0} or pass one explicitly")]
    MissingToken(&'static str),

    #[error("unknown output format '{input}'; valid formats: {valid}")]
    UnknownFormat { input: String, valid: String },
}
