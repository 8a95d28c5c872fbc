//! Chat client for locally hosted language models.
//!
//! Talks to Ollama's native API or to any OpenAI-compatible server
//! (LM Studio, llama.cpp, Ollama's `/v1` endpoints).

use async_trait::async_trait;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Default address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Wire protocol spoken by the model server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama native API (`/api/chat`, `/api/tags`).
    #[default]
    Ollama,
    /// OpenAI-compatible API (`/v1/chat/completions`, `/v1/models`).
    OpenAI,
}

/// Sampling options for one completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 256,
        }
    }
}

/// An installed model as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name including tag, e.g. `llama3.2:latest`.
    pub name: String,
    /// Size on disk when the server reports it.
    pub size_bytes: Option<u64>,
}

/// Text generation backend consumed by the model-backed oracle.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends one prompt with a system instruction and returns the reply text.
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// Lists models available on the server.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;
}

/// Configuration for [`LlmClient`].
#[derive(Debug, Clone, Getters)]
pub struct LlmConfig {
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl LlmConfig {
    /// Creates a new LLM configuration.
    #[instrument(skip(api_key), fields(provider = ?provider, model = %model))]
    pub fn new(
        provider: LlmProvider,
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        debug!("Creating LLM config");
        Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            timeout,
        }
    }
}

/// HTTP client for a model server.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    /// Creates a new LLM client.
    #[instrument(skip(config), fields(provider = ?config.provider(), base_url = %config.base_url()))]
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        info!("Creating LLM client");
        let http = reqwest::Client::builder()
            .timeout(*config.timeout())
            .build()
            .map_err(|e| {
                LlmError::new(
                    LlmErrorKind::Transport,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self { config, http })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Sends a request and returns the parsed JSON body of a 2xx reply.
    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, LlmError> {
        let response = self.with_auth(request).send().await.map_err(|e| {
            error!(error = ?e, "Model server request failed");
            LlmError::new(
                LlmErrorKind::Transport,
                format!("Model server request failed: {}", e),
            )
        })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            error!(error = ?e, "Failed to read model server response");
            LlmError::new(
                LlmErrorKind::Transport,
                format!("Failed to read response: {}", e),
            )
        })?;

        if status == reqwest::StatusCode::NOT_FOUND {
            error!(response = %response_text, "Model not found");
            return Err(LlmError::new(
                LlmErrorKind::ModelNotFound,
                format!(
                    "Model '{}' not found on {}: {}",
                    self.config.model, self.config.base_url, response_text
                ),
            ));
        }

        if !status.is_success() {
            error!(status = %status, response = %response_text, "Model server error");
            return Err(LlmError::new(
                LlmErrorKind::Status,
                format!("Model server error {}: {}", status, response_text),
            ));
        }

        debug!(response_length = response_text.len(), "Parsing model server response");
        serde_json::from_str(&response_text).map_err(|e| {
            error!(error = ?e, response = %response_text, "Failed to parse response");
            LlmError::new(
                LlmErrorKind::Malformed,
                format!("Failed to parse response: {}", e),
            )
        })
    }

    /// Generates a completion using Ollama's native chat endpoint.
    #[instrument(skip(self, prompt, system))]
    async fn complete_ollama(
        &self,
        prompt: &str,
        system: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "stream": false,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_tokens
            }
        });

        debug!("Sending request to Ollama");
        let response_json = self
            .send_json(self.http.post(self.url("/api/chat")).json(&request_body))
            .await?;

        let content = response_json["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                error!(response = %response_json, "No message content in Ollama response");
                LlmError::new(
                    LlmErrorKind::Malformed,
                    "No message content in Ollama response".to_string(),
                )
            })?
            .to_string();

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }

    /// Generates a completion using an OpenAI-compatible endpoint.
    #[instrument(skip(self, prompt, system))]
    async fn complete_openai(
        &self,
        prompt: &str,
        system: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens
        });

        debug!("Sending request to OpenAI-compatible server");
        let response_json = self
            .send_json(
                self.http
                    .post(self.url("/v1/chat/completions"))
                    .json(&request_body),
            )
            .await?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                error!(response = %response_json, "No content in chat completion response");
                LlmError::new(
                    LlmErrorKind::Malformed,
                    "No content in chat completion response".to_string(),
                )
            })?
            .to_string();

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

#[derive(Deserialize)]
struct OllamaTags {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct OpenAiModels {
    data: Vec<OpenAiModel>,
}

#[derive(Deserialize)]
struct OpenAiModel {
    id: String,
}

fn malformed(e: serde_json::Error) -> LlmError {
    LlmError::new(
        LlmErrorKind::Malformed,
        format!("Unexpected model list format: {}", e),
    )
}

#[async_trait]
impl ChatModel for LlmClient {
    #[instrument(skip(self, prompt, system), fields(provider = ?self.config.provider, model = %self.config.model))]
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        debug!("Generating completion");
        match self.config.provider {
            LlmProvider::Ollama => self.complete_ollama(prompt, system, options).await,
            LlmProvider::OpenAI => self.complete_openai(prompt, system, options).await,
        }
    }

    #[instrument(skip(self), fields(provider = ?self.config.provider))]
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let models = match self.config.provider {
            LlmProvider::Ollama => {
                let body = self.send_json(self.http.get(self.url("/api/tags"))).await?;
                let tags: OllamaTags = serde_json::from_value(body).map_err(malformed)?;
                tags.models
                    .into_iter()
                    .map(|m| ModelInfo {
                        name: m.name,
                        size_bytes: m.size,
                    })
                    .collect::<Vec<_>>()
            }
            LlmProvider::OpenAI => {
                let body = self.send_json(self.http.get(self.url("/v1/models"))).await?;
                let list: OpenAiModels = serde_json::from_value(body).map_err(malformed)?;
                list.data
                    .into_iter()
                    .map(|m| ModelInfo {
                        name: m.id,
                        size_bytes: None,
                    })
                    .collect()
            }
        };
        info!(count = models.len(), "Listed models");
        Ok(models)
    }
}

/// Category of an [`LlmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LlmErrorKind {
    /// Server unreachable, timed out or connection dropped.
    #[display("transport")]
    Transport,
    /// The requested model is not installed.
    #[display("model not found")]
    ModelNotFound,
    /// Any other non-success HTTP status.
    #[display("status")]
    Status,
    /// The reply could not be interpreted.
    #[display("malformed response")]
    Malformed,
}

/// LLM client error.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error ({}): {} at {}:{}", kind, message, file, line)]
pub struct LlmError {
    /// Error category.
    pub kind: LlmErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: LlmErrorKind, message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, %kind, "LLM error created");
        Self {
            kind,
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
