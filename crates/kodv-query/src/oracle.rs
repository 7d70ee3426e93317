//! Text-completion oracle clients.
//!
//! The pipeline treats the model as an opaque `prompt -> text` function: one
//! stateless call per question, no tools, no chat history.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::OracleError;

#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Returns the completion text for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;

    /// Short label for logs, e.g. `gemini(gemini-2.5-flash)`.
    fn describe(&self) -> String;
}

// ============================================================================
// Gemini
// ============================================================================

pub struct GeminiOracle {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiOracle {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(config: &LlmConfig) -> Result<Self, OracleError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl CompletionOracle for GeminiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(OracleError::Api(format!("{status}: {error_text}")));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        Ok(gemini_extract_text(&data))
    }

    fn describe(&self) -> String {
        format!("gemini({})", self.model)
    }
}

/// Concatenates the text parts of the first candidate. A blocked or empty
/// candidate yields an empty string; the generator reports that as "no query
/// produced".
fn gemini_extract_text(data: &serde_json::Value) -> String {
    data["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

// ============================================================================
// OpenAI-compatible chat completions (OpenAI, vLLM, Ollama's /v1)
// ============================================================================

pub struct OpenAiOracle {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiOracle {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(config: &LlmConfig) -> Result<Self, OracleError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl CompletionOracle for OpenAiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0,
        });

        let mut request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(OracleError::Api(format!("{status}: {error_text}")));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        Ok(data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }

    fn describe(&self) -> String {
        format!("openai({})", self.model)
    }
}

// ============================================================================
// Construction
// ============================================================================

fn build_client(timeout: Duration) -> Result<Client, OracleError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| OracleError::Network(format!("failed to create HTTP client: {e}")))
}

/// Builds the oracle selected by `config`.
pub fn from_config(config: &LlmConfig) -> Result<Box<dyn CompletionOracle>, OracleError> {
    Ok(match config.provider {
        LlmProvider::Gemini => Box::new(GeminiOracle::new(config)?),
        LlmProvider::OpenAi => Box::new(OpenAiOracle::new(config)?),
    })
}
