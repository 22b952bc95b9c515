//! Google Gemini `generateContent` backend.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use parsesmith_contracts::error::{SmithError, SmithResult};

use crate::model::{http_failure, CompletionBackend, SYSTEM_PROMPT};

const PROVIDER: &str = "gemini";

pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(
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
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl CompletionBackend for GeminiBackend {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> SmithResult<String> {
        let request = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.1 },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| SmithError::Generation {
                reason: format!("{PROVIDER} request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| SmithError::Generation {
            reason: format!("{PROVIDER} response unreadable: {e}"),
        })?;
        if !status.is_success() {
            return Err(http_failure(PROVIDER, status.as_u16(), &body));
        }

        debug!(provider = PROVIDER, bytes = body.len(), "completion received");
        parse_generate_response(&body)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn parse_generate_response(body: &str) -> SmithResult<String> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| SmithError::Generation {
        reason: format!("{PROVIDER} returned malformed JSON: {e}"),
    })?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(SmithError::Generation {
            reason: format!("{PROVIDER} returned no completion text"),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"entry = "},{"text":"\"parse\""}],"role":"model"}}]}"#;
        assert_eq!(parse_generate_response(body).unwrap(), "entry = \"parse\"");
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = parse_generate_response(body).unwrap_err();
        assert!(err.to_string().contains("no completion text"));
    }

    #[test]
    fn endpoint_includes_model() {
        let backend = GeminiBackend::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "key",
            "gemini-1.5-flash",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            backend.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
