//! Generation request description and its local validation.
//!
//! A [`JobSpec`] is built once per invocation by whatever front end
//! collects the input (CLI, GUI) and is checked here before the job
//! client sends anything over the network.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Minimum number of views accepted in multiview mode.
pub const MIN_MULTIVIEW_IMAGES: usize = 2;
/// Maximum number of views accepted in multiview mode.
pub const MAX_MULTIVIEW_IMAGES: usize = 6;
/// Upper bound on a single uploaded image (20 MiB).
pub const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// Image file extensions the remote service accepts.
pub const VALID_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

// ---------------------------------------------------------------------------
// Generation mode
// ---------------------------------------------------------------------------

/// Which kind of input drives the generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    SingleImage,
    Multiview,
    Text,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleImage => "single-image",
            Self::Multiview => "multiview",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Output format
// ---------------------------------------------------------------------------

/// Model file format produced server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Glb,
    Fbx,
    Obj,
    Stl,
    Usdz,
}

impl OutputFormat {
    /// Every supported format, in the order they are listed to users.
    pub const ALL: [OutputFormat; 5] = [Self::Glb, Self::Fbx, Self::Obj, Self::Stl, Self::Usdz];

    /// Lowercase name as sent to the remote service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Fbx => "fbx",
            Self::Obj => "obj",
            Self::Stl => "stl",
            Self::Usdz => "usdz",
        }
    }

    /// File extension (without the dot) for saved models.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Return `path` with this format's extension, leaving it untouched
    /// when it already ends with it (case-insensitive).
    pub fn adjust_output_path(&self, path: &Path) -> PathBuf {
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.extension()));

        if matches {
            path.to_path_buf()
        } else {
            path.with_extension(self.extension())
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownFormat {
                input: s.to_string(),
                valid: Self::ALL.map(|f| f.as_str()).join(", "),
            })
    }
}

// ---------------------------------------------------------------------------
// Job spec
// ---------------------------------------------------------------------------

/// A generation request before submission.
///
/// Fields are public so any front end can assemble one; nothing is sent
/// until [`JobSpec::validate`] has accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub mode: GenerationMode,
    /// Input images in view order. Empty in text mode.
    pub images: Vec<PathBuf>,
    /// Text prompt. Present only in text mode.
    pub prompt: Option<String>,
    pub format: OutputFormat,
    /// Remote model version; `None` lets the service pick its default.
    pub model_version: Option<String>,
}

impl JobSpec {
    /// Text-to-3D request.
    pub fn text(prompt: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            mode: GenerationMode::Text,
            images: Vec::new(),
            prompt: Some(prompt.into()),
            format,
            model_version: None,
        }
    }

    /// Image-to-3D request from one picture.
    pub fn single_image(image: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            mode: GenerationMode::SingleImage,
            images: vec![image.into()],
            prompt: None,
            format,
            model_version: None,
        }
    }

    /// Multiview-to-3D request. Views are uploaded in the given order.
    pub fn multiview<I, P>(images: I, format: OutputFormat) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            mode: GenerationMode::Multiview,
            images: images.into_iter().map(Into::into).collect(),
            prompt: None,
            format,
            model_version: None,
        }
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    /// Check the mode/input invariant without touching the filesystem.
    ///
    /// - single-image: exactly 1 image, no prompt
    /// - multiview: 2..=6 images, no prompt
    /// - text: no images, a non-blank prompt
    pub fn check_shape(&self) -> Result<(), ValidationError> {
        let count = self.images.len();

        match self.mode {
            GenerationMode::SingleImage => {
                if count != 1 {
                    return Err(ValidationError::ImageCount {
                        mode: self.mode,
                        expected: "exactly 1",
                        got: count,
                    });
                }
                if self.prompt.is_some() {
                    return Err(ValidationError::PromptNotAllowed(self.mode));
                }
            }
            GenerationMode::Multiview => {
                if !(MIN_MULTIVIEW_IMAGES..=MAX_MULTIVIEW_IMAGES).contains(&count) {
                    return Err(ValidationError::ImageCount {
                        mode: self.mode,
                        expected: "2 to 6",
                        got: count,
                    });
                }
                if self.prompt.is_some() {
                    return Err(ValidationError::PromptNotAllowed(self.mode));
                }
            }
            GenerationMode::Text => {
                if count != 0 {
                    return Err(ValidationError::ImageCount {
                        mode: self.mode,
                        expected: "no",
                        got: count,
                    });
                }
                match self.prompt.as_deref() {
                    None => return Err(ValidationError::MissingPrompt),
                    Some(p) if p.trim().is_empty() => return Err(ValidationError::BlankPrompt),
                    Some(_) => {}
                }
            }
        }

        if self
            .model_version
            .as_deref()
            .is_some_and(|v| v.trim().is_empty())
        {
            return Err(ValidationError::BlankModelVersion);
        }

        Ok(())
    }

    /// Full local validation: [`check_shape`](Self::check_shape) plus a
    /// metadata check of every image file.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.check_shape()?;
        for image in &self.images {
            validate_image_file(image)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Image checks
// ---------------------------------------------------------------------------

/// Lowercased extension of an image path, if it has one.
pub fn image_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Check that `path` is an existing regular file of a supported type and
/// at most [`MAX_IMAGE_BYTES`].
pub fn validate_image_file(path: &Path) -> Result<(), ValidationError> {
    let extension = image_extension(path).unwrap_or_default();
    if !VALID_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedImageType {
            path: path.to_path_buf(),
            extension,
            allowed: VALID_IMAGE_EXTENSIONS.join(", "),
        });
    }

    let meta = std::fs::metadata(path)
        .map_err(|_| ValidationError::ImageNotFound(path.to_path_buf()))?;
    if !meta.is_file() {
        return Err(ValidationError::NotAFile(path.to_path_buf()));
    }
    if meta.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::ImageTooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            limit: MAX_IMAGE_BYTES,
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn views(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("view{i}.png"))).collect()
    }

    // -- check_shape: accepted combinations --

    #[test]
    fn text_with_prompt_is_accepted() {
        assert!(JobSpec::text("a wooden barrel", OutputFormat::Glb)
            .check_shape()
            .is_ok());
    }

    #[test]
    fn single_image_is_accepted() {
        assert!(JobSpec::single_image("photo.png", OutputFormat::Fbx)
            .check_shape()
            .is_ok());
    }

    #[test]
    fn multiview_between_two_and_six_is_accepted() {
        for n in MIN_MULTIVIEW_IMAGES..=MAX_MULTIVIEW_IMAGES {
            let spec = JobSpec::multiview(views(n), OutputFormat::Obj);
            assert!(spec.check_shape().is_ok(), "{n} views should be accepted");
        }
    }

    // -- check_shape: rejected combinations --

    #[test]
    fn multiview_outside_bounds_is_rejected() {
        for n in [0, 1, 7, 12] {
            let spec = JobSpec::multiview(views(n), OutputFormat::Obj);
            assert_matches!(
                spec.check_shape(),
                Err(ValidationError::ImageCount { mode: GenerationMode::Multiview, got, .. }) if got == n
            );
        }
    }

    #[test]
    fn single_image_without_image_is_rejected() {
        let mut spec = JobSpec::single_image("photo.png", OutputFormat::Glb);
        spec.images.clear();
        assert_matches!(
            spec.check_shape(),
            Err(ValidationError::ImageCount { got: 0, .. })
        );
    }

    #[test]
    fn single_image_with_two_images_is_rejected() {
        let mut spec = JobSpec::single_image("a.png", OutputFormat::Glb);
        spec.images.push("b.png".into());
        assert_matches!(
            spec.check_shape(),
            Err(ValidationError::ImageCount { got: 2, .. })
        );
    }

    #[test]
    fn prompt_with_images_is_rejected() {
        let mut spec = JobSpec::single_image("photo.png", OutputFormat::Glb);
        spec.prompt = Some("a barrel".into());
        assert_matches!(
            spec.check_shape(),
            Err(ValidationError::PromptNotAllowed(GenerationMode::SingleImage))
        );

        let mut spec = JobSpec::multiview(views(3), OutputFormat::Glb);
        spec.prompt = Some("a barrel".into());
        assert_matches!(
            spec.check_shape(),
            Err(ValidationError::PromptNotAllowed(GenerationMode::Multiview))
        );
    }

    #[test]
    fn text_with_images_is_rejected() {
        let mut spec = JobSpec::text("a barrel", OutputFormat::Glb);
        spec.images.push("photo.png".into());
        assert_matches!(
            spec.check_shape(),
            Err(ValidationError::ImageCount { mode: GenerationMode::Text, got: 1, .. })
        );
    }

    #[test]
    fn text_without_prompt_is_rejected() {
        let mut spec = JobSpec::text("x", OutputFormat::Glb);
        spec.prompt = None;
        assert_matches!(spec.check_shape(), Err(ValidationError::MissingPrompt));

        let spec = JobSpec::text("   ", OutputFormat::Glb);
        assert_matches!(spec.check_shape(), Err(ValidationError::BlankPrompt));
    }

    #[test]
    fn blank_model_version_is_rejected() {
        let spec = JobSpec::text("a barrel", OutputFormat::Glb).with_model_version(" ");
        assert_matches!(spec.check_shape(), Err(ValidationError::BlankModelVersion));
    }

    // -- validate: filesystem checks --

    #[test]
    fn validate_checks_image_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("front.PNG");
        std::fs::write(&good, b"\x89PNG").unwrap();

        assert!(JobSpec::single_image(&good, OutputFormat::Glb)
            .validate()
            .is_ok());

        let missing = dir.path().join("missing.png");
        assert_matches!(
            JobSpec::single_image(&missing, OutputFormat::Glb).validate(),
            Err(ValidationError::ImageNotFound(p)) if p == missing
        );

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert_matches!(
            JobSpec::single_image(&text, OutputFormat::Glb).validate(),
            Err(ValidationError::UnsupportedImageType { extension, .. }) if extension == "txt"
        );

        let folder = dir.path().join("folder.png");
        std::fs::create_dir(&folder).unwrap();
        assert_matches!(
            JobSpec::single_image(&folder, OutputFormat::Glb).validate(),
            Err(ValidationError::NotAFile(_))
        );
    }

    #[test]
    fn validate_rejects_oversized_image() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.jpg");
        let file = std::fs::File::create(&big).unwrap();
        file.set_len(MAX_IMAGE_BYTES + 1).unwrap();

        assert_matches!(
            JobSpec::single_image(&big, OutputFormat::Glb).validate(),
            Err(ValidationError::ImageTooLarge { size, .. }) if size == MAX_IMAGE_BYTES + 1
        );
    }

    // -- output format --

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("GLB".parse::<OutputFormat>().unwrap(), OutputFormat::Glb);
        assert_eq!(" usdz ".parse::<OutputFormat>().unwrap(), OutputFormat::Usdz);
        assert_matches!(
            "ply".parse::<OutputFormat>(),
            Err(ValidationError::UnknownFormat { input, .. }) if input == "ply"
        );
    }

    #[test]
    fn adjust_output_path_appends_missing_extension() {
        let fbx = OutputFormat::Fbx;
        assert_eq!(
            fbx.adjust_output_path(Path::new("out/model.glb")),
            PathBuf::from("out/model.fbx")
        );
        assert_eq!(
            fbx.adjust_output_path(Path::new("model")),
            PathBuf::from("model.fbx")
        );
        assert_eq!(
            fbx.adjust_output_path(Path::new("Model.FBX")),
            PathBuf::from("Model.FBX")
        );
    }
}
