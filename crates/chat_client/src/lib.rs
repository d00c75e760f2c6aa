//! Async chat-completion client.
//!
//! The Magic Wish item ships a player's wish to an OpenAI-style
//! chat-completion endpoint and runs the returned lines as console
//! commands. This crate owns only the narrow request/response contract;
//! callers decide what to do with the text (and whether to retry — the
//! client never does).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default completion endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Errors surfaced by a completion request.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("chat api response carried no choices")]
    EmptyResponse,
}

/// A service that turns a prompt into a completion.
///
/// Any non-success status is a hard failure; retry policy belongs to the
/// caller.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn request(&self, prompt: &str) -> Result<String, ChatError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self, ChatError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, model, timeout)
    }

    /// Point the client at a non-default endpoint (tests, proxies).
    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn request(&self, prompt: &str) -> Result<String, ChatError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, "sending completion request");
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        let choice = parsed.choices.into_iter().next().ok_or(ChatError::EmptyResponse)?;
        Ok(choice.message.content.trim().to_string())
    }
}
