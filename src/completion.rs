//! OpenAI-compatible chat-completions client.
//!
//! One POST per synthesis, no retries, no streaming. The orchestrator
//! builds a [`SynthesisRequest`]; the client returns the raw assistant
//! text and leaves parsing to the normalizer.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::CompletionConfig;

/// Instruction/context payload for one synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub system: String,
    pub user: String,
    pub temperature: f64,
}

/// The completion endpoint failed; the owning operation aborts.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Non-success status. `body` is kept for logs, never for clients.
    #[error("completion endpoint returned status {status}")]
    Status { status: u16, body: String },
    /// Connect, timeout, or body-decode failure.
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Seam between the orchestrator and the hosted model.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Run one completion and return the assistant message text.
    async fn complete(&self, request: &SynthesisRequest) -> Result<String, CompletionError>;
}

/// [`Synthesizer`] over an OpenAI-compatible chat-completions endpoint.
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl CompletionClient {
    /// Build the client from configuration.
    ///
    /// # Errors
    ///
    /// Fails when the credential is absent or the HTTP client cannot be
    /// constructed.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = match &config.api_key {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => bail!("COMPLETION_API_KEY environment variable not set"),
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building completion HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Synthesizer for CompletionClient {
    async fn complete(&self, request: &SynthesisRequest) -> Result<String, CompletionError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
        });

        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response.json().await?;
        Ok(content_from_response(&json))
    }
}

/// Pull the assistant text out of a chat-completions response.
///
/// A missing message becomes the literal empty JSON object, which
/// downstream coercion expands into a well-shaped empty result.
fn content_from_response(json: &Value) -> String {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .unwrap_or("{}")
        .to_string()
}
