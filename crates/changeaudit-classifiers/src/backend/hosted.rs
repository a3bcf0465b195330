//! Hosted text-generation inference API
//!
//! The whole request travels as one composed prompt in `inputs`; the reply is
//! free text which may wrap the JSON verdict in prose or code fences.

use super::{BackendError, GenerationRequest, ModelBackend};
use crate::config::BackendConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Backend for a hosted inference API
#[derive(Debug, Clone)]
pub struct HostedBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    temperature: f32,
    max_new_tokens: u32,
}

impl HostedBackend {
    /// Create a backend posting to `endpoint`
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        api_key: Option<String>,
        config: &BackendConfig,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            temperature: config.temperature,
            max_new_tokens: config.max_new_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// Pull the generated text out of the known reply shapes
fn generated_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Array(items) => items.into_iter().next().and_then(generated_text),
        Value::Object(mut map) => match map.remove("generated_text") {
            Some(Value::String(text)) => Some(text),
            _ => None,
        },
        _ => None,
    }
}

#[async_trait]
impl ModelBackend for HostedBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = InferenceRequest {
            inputs: request.composed(),
            parameters: InferenceParameters {
                max_new_tokens: self.max_new_tokens,
                temperature: self.temperature,
                return_full_text: false,
            },
        };

        debug!(endpoint = %self.endpoint, "Sending inference request");
        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        generated_text(value).ok_or_else(|| {
            BackendError::InvalidResponse("reply has no generated_text".to_string())
        })
    }

    fn name(&self) -> &str {
        "hosted"
    }

    fn expects_json(&self) -> bool {
        false
    }
}
