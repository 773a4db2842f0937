//! Ollama Completion Adapter
//!
//! `CompletionProvider` implementation for a local Ollama server's
//! `/api/generate` endpoint. Non-streaming; every request carries a hard
//! timeout so the maintenance summarizer and extraction pipeline degrade
//! rather than hang on a stalled server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{parse_json_block, CompletionOptions, CompletionProvider};
use crate::utils::error::{EngineError, EngineResult};

/// Default Ollama API endpoint
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Default completion model
const DEFAULT_MODEL: &str = "llama2:7b";

/// Request timeout for completion calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama-backed completion provider.
pub struct OllamaCompletion {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaCompletion {
    /// Create a provider against the default local endpoint and model.
    pub fn new() -> Self {
        Self::with_config(OLLAMA_DEFAULT_URL, DEFAULT_MODEL)
    }

    /// Create a provider for a specific endpoint and model.
    pub fn with_config(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        json_format: bool,
    ) -> EngineResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: json_format.then_some("json"),
            options: GenerateOptions {
                temperature: options.temperature,
                top_p: options.top_p,
                num_predict: options.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::completion(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::completion(format!(
                "HTTP {} from completion server: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            EngineError::completion(format!("unparseable completion response: {}", e))
        })?;

        Ok(parsed.response)
    }
}

impl Default for OllamaCompletion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for OllamaCompletion {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> EngineResult<String> {
        self.generate(prompt, options, false).await
    }

    async fn complete_structured(&self, prompt: &str) -> EngineResult<Option<serde_json::Value>> {
        let text = self
            .generate(prompt, &CompletionOptions::default(), true)
            .await?;

        let parsed = parse_json_block(&text);
        if parsed.is_none() {
            warn!(
                model = %self.model,
                "completion model produced non-JSON output for structured request"
            );
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let provider = OllamaCompletion::new();
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(provider.base_url, OLLAMA_DEFAULT_URL);
    }

    #[test]
    fn test_request_serialization_includes_format_for_json() {
        let request = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: Some("json"),
            options: GenerateOptions {
                temperature: 0.7,
                top_p: 0.9,
                num_predict: 300,
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"format\":\"json\""));
        assert!(json.contains("\"num_predict\":300"));
    }
}
