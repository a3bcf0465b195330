//! Model backends
//!
//! Two interchangeable transports sit behind [`ModelBackend`]:
//! - [`LocalBackend`]: a self-hosted generation endpoint that takes a system
//!   instruction and a prompt and is asked to answer in JSON
//! - [`HostedBackend`]: a hosted text-generation API that takes a single
//!   composed prompt and answers with free text
//!
//! Which one is used is decided by [`BackendConfig::kind`], never by the caller.

mod hosted;
mod local;

pub use hosted::HostedBackend;
pub use local::LocalBackend;

use crate::config::{BackendConfig, BackendKind};
use async_trait::async_trait;
use changeaudit_core::Result;
use std::sync::Arc;

/// One generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Fixed task instruction
    pub system: String,

    /// Per-pair prompt
    pub prompt: String,
}

impl GenerationRequest {
    /// Create a new request
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }

    /// System instruction and prompt joined into one string
    pub fn composed(&self) -> String {
        format!("{}\n\n{}", self.system, self.prompt)
    }
}

/// Errors raised by a backend call
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request exceeded its deadline
    #[error("backend request timed out")]
    Timeout,

    /// The reply did not have the expected shape
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Whether a retry might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Trait for language-model transports
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Generate a completion for the request, returning the raw model text
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, BackendError>;

    /// Backend name for logs
    fn name(&self) -> &str;

    /// Whether replies are bare JSON; prose replies are then rejected instead of searched
    fn expects_json(&self) -> bool;
}

/// Build an HTTP client honouring the configured timeout
pub fn http_client(config: &BackendConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| changeaudit_core::Error::config(format!("failed to build HTTP client: {}", e)))
}

/// Create the backend selected by the configuration
pub fn build_backend(config: &BackendConfig) -> Result<Arc<dyn ModelBackend>> {
    config.validate()?;
    let client = http_client(config)?;
    let endpoint = config.endpoint()?;

    let backend: Arc<dyn ModelBackend> = match config.kind {
        BackendKind::Local => Arc::new(LocalBackend::new(client, &endpoint, config)),
        BackendKind::Hosted => Arc::new(HostedBackend::new(
            client,
            &endpoint,
            config.api_key()?,
            config,
        )),
    };

    tracing::info!(backend = backend.name(), endpoint = %endpoint, model = %config.model, "Model backend ready");
    Ok(backend)
}
