//! OpenAI-compatible chat completions backend.
//!
//! Works with OpenAI, Groq, and any other endpoint that speaks
//! `POST {base_url}/chat/completions`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parsesmith_contracts::error::{SmithError, SmithResult};

use crate::model::{http_failure, CompletionBackend, SYSTEM_PROMPT};

const TEMPERATURE: f32 = 0.1;

pub struct OpenAiBackend {
    client: Client,
    provider: String,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> SmithResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SmithError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl CompletionBackend for OpenAiBackend {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> SmithResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| SmithError::Generation {
                reason: format!("{} request failed: {}", self.provider, e),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| SmithError::Generation {
            reason: format!("{} response unreadable: {}", self.provider, e),
        })?;
        if !status.is_success() {
            return Err(http_failure(&self.provider, status.as_u16(), &body));
        }

        debug!(provider = %self.provider, bytes = body.len(), "completion received");
        parse_chat_response(&self.provider, &body)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the first choice's text from a chat completions body.
pub(crate) fn parse_chat_response(provider: &str, body: &str) -> SmithResult<String> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| SmithError::Generation {
        reason: format!("{provider} returned malformed JSON: {e}"),
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| SmithError::Generation {
            reason: format!("{provider} returned no completion text"),
        })
}
