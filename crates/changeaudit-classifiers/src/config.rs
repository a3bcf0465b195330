//! Configuration for model backends and the audit pipeline

use changeaudit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default address of a self-hosted generation endpoint
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";

/// Which transport to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Self-hosted endpoint taking system + prompt and returning JSON
    #[default]
    Local,
    /// Hosted inference API taking one composed prompt and returning free text
    Hosted,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "hosted" | "cloud" => Ok(Self::Hosted),
            other => Err(format!("unknown backend '{}': expected local or hosted", other)),
        }
    }
}

/// Model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Transport variant
    #[serde(default)]
    pub kind: BackendKind,

    /// Endpoint URL; the local backend falls back to [`DEFAULT_LOCAL_URL`]
    #[serde(default)]
    pub url: Option<String>,

    /// Model name sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API token (hosted backend)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transient transport or 5xx failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Generation length cap
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: None,
            model: default_model(),
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl BackendConfig {
    /// Endpoint URL after applying the per-kind default
    pub fn endpoint(&self) -> Result<String> {
        match (&self.url, self.kind) {
            (Some(url), _) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            (_, BackendKind::Local) => Ok(DEFAULT_LOCAL_URL.to_string()),
            (_, BackendKind::Hosted) => Err(Error::config(
                "hosted backend requires backend.url to be set",
            )),
        }
    }

    /// Resolve the API token from the environment, if one is configured
    pub fn api_key(&self) -> Result<Option<String>> {
        match &self.api_key_env {
            Some(var) => std::env::var(var).map(Some).map_err(|_| {
                Error::config(format!(
                    "environment variable {} (backend.api_key_env) is not set",
                    var
                ))
            }),
            None => Ok(None),
        }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between retries
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Check the configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;
        self.api_key()?;
        if self.timeout_secs == 0 {
            return Err(Error::config("backend.timeout_secs must be greater than 0"));
        }
        if self.model.trim().is_empty() {
            return Err(Error::config("backend.model must not be empty"));
        }
        Ok(())
    }
}

/// Audit pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Classification requests in flight at once (1 = sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl PipelineConfig {
    /// Check the configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::config("pipeline.concurrency must be at least 1"));
        }
        Ok(())
    }
}

fn default_model() -> String {
    "gemma3:4b".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_max_new_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.1
}

fn default_concurrency() -> usize {
    1
}
