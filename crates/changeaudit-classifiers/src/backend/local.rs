//! Self-hosted generation endpoint (Ollama-compatible `/api/generate`)

use super::{BackendError, GenerationRequest, ModelBackend};
use crate::config::BackendConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Backend for a local or self-hosted generation server
#[derive(Debug, Clone)]
pub struct LocalBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_new_tokens: u32,
}

impl LocalBackend {
    /// Create a backend for the server at `base_url`
    pub fn new(client: reqwest::Client, base_url: &str, config: &BackendConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_new_tokens: config.max_new_tokens,
        }
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    format: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl ModelBackend for LocalBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model: &self.model,
            system: &request.system,
            prompt: &request.prompt,
            format: "json",
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_new_tokens,
            },
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "Sending generate request");
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        "local"
    }

    fn expects_json(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_path() {
        let client = reqwest::Client::new();
        let config = BackendConfig::default();
        let backend = LocalBackend::new(client.clone(), "http://gpu-box:11434/", &config);
        assert_eq!(backend.endpoint(), "http://gpu-box:11434/api/generate");

        let backend = LocalBackend::new(client, "http://gpu-box:11434", &config);
        assert_eq!(backend.endpoint(), "http://gpu-box:11434/api/generate");
    }
}
