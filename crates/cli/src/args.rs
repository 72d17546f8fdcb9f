use std::path::PathBuf;

use clap::Parser;
use meshgen_core::{JobSpec, OutputFormat};

use crate::config::ConfigError;

/// Generate 3D models from images or a text prompt with the Tripo API.
#[derive(Parser, Debug)]
#[command(name = "meshgen", version, about = "Generate 3D models with the Tripo API")]
pub struct Args {
    /// Input image; repeat 2 to 6 times for multiview generation
    #[arg(short, long = "image", value_name = "PATH", conflicts_with = "prompt")]
    pub images: Vec<PathBuf>,

    /// Text prompt for text-to-3D generation
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Where to save the model; the extension is adjusted to the format
    #[arg(short, long, value_name = "PATH", required_unless_present = "balance")]
    pub output: Option<PathBuf>,

    /// Output format: glb, fbx, obj, stl or usdz
    #[arg(short, long, default_value = "glb")]
    pub format: OutputFormat,

    /// Remote model version (service default when omitted)
    #[arg(long)]
    pub model_version: Option<String>,

    /// API key (overrides TRIPO_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Maximum seconds to wait for the job (overrides TRIPO_TIMEOUT_SECS)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between status polls (overrides TRIPO_POLL_INTERVAL_SECS)
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Print the account credit balance and exit
    #[arg(long)]
    pub balance: bool,
}

impl Args {
    /// Build the job from the input flags.
    ///
    /// One image means single-image mode, more than one means multiview;
    /// the view count itself is checked by [`JobSpec::validate`].
    pub fn job_spec(&self) -> Result<JobSpec, ConfigError> {
        let spec = match (self.images.len(), &self.prompt) {
            (0, Some(prompt)) => JobSpec::text(prompt.clone(), self.format),
            (0, None) => return Err(ConfigError::NoInput),
            (1, _) => JobSpec::single_image(self.images[0].clone(), self.format),
            _ => JobSpec::multiview(self.images.iter().cloned(), self.format),
        };

        Ok(match &self.model_version {
            Some(version) => spec.with_model_version(version.clone()),
            None => spec,
        })
    }

    /// Output path with the extension matching `--format`.
    pub fn output_path(&self) -> Result<PathBuf, ConfigError> {
        let output = self.output.as_deref().ok_or(ConfigError::NoOutput)?;
        Ok(self.format.adjust_output_path(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use meshgen_core::GenerationMode;
    use std::path::Path;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("meshgen").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn image_count_selects_mode() {
        let args = parse(&["--image", "a.png", "-o", "out.glb"]);
        assert_eq!(args.job_spec().unwrap().mode, GenerationMode::SingleImage);

        let args = parse(&["-i", "front.png", "-i", "back.png", "-i", "left.png", "-o", "out.glb"]);
        let spec = args.job_spec().unwrap();
        assert_eq!(spec.mode, GenerationMode::Multiview);
        assert_eq!(spec.images.len(), 3);
        assert_eq!(spec.images[0], Path::new("front.png"));

        let args = parse(&["--prompt", "a wooden barrel", "-o", "barrel"]);
        let spec = args.job_spec().unwrap();
        assert_eq!(spec.mode, GenerationMode::Text);
        assert_eq!(spec.prompt.as_deref(), Some("a wooden barrel"));
    }

    #[test]
    fn format_and_model_version_are_passed_through() {
        let args = parse(&["-p", "a chair", "-o", "chair", "-f", "FBX", "--model-version", "v2.5-20250123"]);
        let spec = args.job_spec().unwrap();
        assert_eq!(spec.format, OutputFormat::Fbx);
        assert_eq!(spec.model_version.as_deref(), Some("v2.5-20250123"));
    }

    #[test]
    fn output_extension_follows_format() {
        let args = parse(&["-p", "a chair", "-o", "out/chair.glb", "-f", "obj"]);
        assert_eq!(args.output_path().unwrap(), Path::new("out/chair.obj"));

        let args = parse(&["-p", "a chair", "-o", "chair.GLB"]);
        assert_eq!(args.output_path().unwrap(), Path::new("chair.GLB"));
    }

    #[test]
    fn no_input_is_an_error() {
        let args = parse(&["-o", "out.glb"]);
        assert_matches!(args.job_spec(), Err(ConfigError::NoInput));
    }

    #[test]
    fn image_and_prompt_conflict() {
        let result = Args::try_parse_from(["meshgen", "-i", "a.png", "-p", "a cup", "-o", "x.glb"]);
        assert!(result.is_err());
    }

    #[test]
    fn output_is_optional_for_balance() {
        let args = parse(&["--balance"]);
        assert!(args.balance);
        assert!(Args::try_parse_from(["meshgen", "-p", "a cup"]).is_err());
    }

    #[test]
    fn unknown_format_is_rejected_by_parser() {
        assert!(Args::try_parse_from(["meshgen", "-p", "a cup", "-o", "x", "-f", "ply"]).is_err());
    }
}
