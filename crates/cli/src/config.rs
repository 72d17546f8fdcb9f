use std::time::Duration;

use meshgen_core::credentials::API_KEY_ENV;
use meshgen_core::{Credentials, ValidationError};
use meshgen_tripo::{JobClient, PollConfig, TripoApi, DEFAULT_BASE_URL};

use crate::args::Args;

/// Default connect and per-read timeout for HTTP requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// Default pause between status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
/// Default total wait for a job to finish.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
/// Default retries for a transient poll failure.
pub const DEFAULT_POLL_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error(transparent)]
    Credentials(#[from] ValidationError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("nothing to generate: pass --image or --prompt")]
    NoInput,

    #[error("--output is required")]
    NoOutput,
}

/// Runtime configuration for the `meshgen` binary.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// API token from the environment; `--api-key` takes precedence.
    pub api_key: Option<String>,
    pub api_base: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub poll_retries: u32,
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                             |
    /// |------------------------------|-------------------------------------|
    /// | `TRIPO_API_KEY`              | none (or `--api-key`)               |
    /// | `TRIPO_API_BASE`             | `https://api.tripo3d.ai/v2/openapi` |
    /// | `TRIPO_REQUEST_TIMEOUT_SECS` | `60`                                |
    /// | `TRIPO_POLL_INTERVAL_SECS`   | `3`                                 |
    /// | `TRIPO_TIMEOUT_SECS`         | `600`                               |
    /// | `TRIPO_POLL_RETRIES`         | `3`                                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty());

        let api_base = lookup("TRIPO_API_BASE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());

        let request_timeout = secs(&lookup, "TRIPO_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let poll_interval = secs(&lookup, "TRIPO_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let timeout = secs(&lookup, "TRIPO_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let poll_retries = match lookup("TRIPO_POLL_RETRIES") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "TRIPO_POLL_RETRIES",
                value,
                expected: "a non-negative integer",
            })?,
            None => DEFAULT_POLL_RETRIES,
        };

        Ok(Self {
            api_key,
            api_base,
            request_timeout,
            poll_interval,
            timeout,
            poll_retries,
        })
    }

    /// Apply command-line values on top of the environment.
    pub fn apply_args(&mut self, args: &Args) -> Result<(), ConfigError> {
        if let Some(t) = args.timeout {
            if t == 0 {
                return Err(ConfigError::Zero("--timeout"));
            }
            self.timeout = Duration::from_secs(t);
        }
        if let Some(i) = args.poll_interval {
            if i == 0 {
                return Err(ConfigError::Zero("--poll-interval"));
            }
            self.poll_interval = Duration::from_secs(i);
        }
        Ok(())
    }

    /// `explicit` wins over `TRIPO_API_KEY`.
    pub fn credentials(&self, explicit: Option<String>) -> Result<Credentials, ConfigError> {
        Ok(Credentials::resolve(explicit, self.api_key.clone())?)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(self.poll_interval, self.timeout)
            .with_retries(self.poll_retries, meshgen_tripo::poller::DEFAULT_RETRY_DELAY)
    }

    pub fn job_client(&self, credentials: Credentials) -> Result<JobClient, ConfigError> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.request_timeout)
            .read_timeout(self.request_timeout)
            .build()?;
        let api = TripoApi::with_client(http, self.api_base.clone(), credentials);
        Ok(JobClient::with_api(api))
    }
}

fn secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(Duration::from_secs(default));
    };
    let parsed: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.clone(),
        expected: "a whole number of seconds",
    })?;
    if parsed == 0 {
        return Err(ConfigError::Zero(var));
    }
    Ok(Duration::from_secs(parsed))
}
