//! Answer generation boundary: grounded prompt assembly and the
//! chat-completion call.
//!
//! The prompt restricts the model to the retrieved context and is capped
//! at a character ceiling before it leaves the process; truncation is a
//! reported warning, never an error. The HTTP call itself is a single
//! POST with a bearer token; a non-2xx response or a network failure
//! surfaces as [`PipelineError::Upstream`] and is never retried.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::PipelineError;

/// Prompt character ceiling (prevents token-limit errors upstream).
pub const MAX_INPUT_CHARS: usize = 14_000;

/// Per-model request settings. The table below is a fixed allow-list;
/// models outside it are rejected before any network call.
#[derive(Debug, Clone, Copy)]
pub struct ModelConfig {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Look up the request settings for an allowed model.
pub fn model_config(model: &str) -> Option<ModelConfig> {
    let config = match model {
        "llama-3.1-8b-instant" => ModelConfig {
            max_tokens: 2000,
            temperature: 0.1,
        },
        "llama-3.2-1b-preview" => ModelConfig {
            max_tokens: 2000,
            temperature: 0.1,
        },
        "llama-3.2-3b-preview" => ModelConfig {
            max_tokens: 2000,
            temperature: 0.1,
        },
        "llama-3.3-70b-versatile" => ModelConfig {
            max_tokens: 1500,
            temperature: 0.1,
        },
        "llama-guard-3-8b" => ModelConfig {
            max_tokens: 2000,
            temperature: 0.1,
        },
        "mixtral-8x7b-32768" => ModelConfig {
            max_tokens: 2000,
            temperature: 0.1,
        },
        _ => return None,
    };
    Some(config)
}

/// Names of all allowed models, for CLI help and error messages.
pub const ALLOWED_MODELS: &[&str] = &[
    "llama-3.1-8b-instant",
    "llama-3.2-1b-preview",
    "llama-3.2-3b-preview",
    "llama-3.3-70b-versatile",
    "llama-guard-3-8b",
    "mixtral-8x7b-32768",
];

/// A grounded prompt ready to send upstream. `truncated` is set when the
/// assembled text exceeded `max_chars` and was cut from the tail.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
    pub truncated: bool,
}

/// Assemble the grounded prompt: fixed instruction, retrieved chunks
/// joined by blank lines, then the literal question.
pub fn build_prompt(context: &[String], question: &str, max_chars: usize) -> Prompt {
    let joined = context.join("\n\n");
    let text = format!(
        "Answer the question using only this context:\n\n{}\n\nQuestion: {}",
        joined, question
    );
    truncate_chars(text, max_chars)
}

/// Cap `text` at `max_chars` characters, cutting from the tail.
fn truncate_chars(text: String, max_chars: usize) -> Prompt {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => Prompt {
            text: text[..byte_idx].to_string(),
            truncated: true,
        },
        None => Prompt {
            text,
            truncated: false,
        },
    }
}

/// Trait for the chat-completion backend. The session layer holds an
/// `Arc<dyn ChatClient>` so tests can substitute a stub for the network.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `prompt` to `model` and return the answer text.
    async fn complete(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, PipelineError>;
}

/// Chat client for a Groq-style OpenAI-compatible endpoint.
pub struct GroqClient {
    api_url: String,
    client: reqwest::Client,
}

impl GroqClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            api_url: config.api_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl ChatClient for GroqClient {
    async fn complete(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, PipelineError> {
        let config = model_config(model).ok_or_else(|| {
            PipelineError::InvalidArgument(format!(
                "unknown model: '{}'. Allowed models: {}",
                model,
                ALLOWED_MODELS.join(", ")
            ))
        })?;

        let body = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Upstream {
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Upstream {
                status: Some(status.as_u16()),
                detail: body_text,
            });
        }

        let json: serde_json::Value =
            response.json().await.map_err(|e| PipelineError::Upstream {
                status: None,
                detail: format!("invalid response body: {}", e),
            })?;

        parse_answer(&json)
    }
}

/// Pull `choices[0].message.content` out of the response JSON.
fn parse_answer(json: &serde_json::Value) -> Result<String, PipelineError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| PipelineError::Upstream {
            status: None,
            detail: "response missing choices[0].message.content".to_string(),
        })
}
