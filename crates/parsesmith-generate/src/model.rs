//! Model-backed generation.
//!
//! `ModelGenerator` renders the prompt, hands it to a `CompletionBackend`,
//! and cleans the reply into bare program source. Backends are blocking and
//! carry their own HTTP timeout.

use std::time::Duration;

use tracing::{debug, warn};

use parsesmith_contracts::{
    candidate::GenerationStrategy,
    error::{SmithError, SmithResult},
};
use parsesmith_core::{prompt::PromptContext, traits::Generator};

use crate::{gemini::GeminiBackend, openai::OpenAiBackend};

/// Default HTTP timeout for one completion request.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// System instruction sent ahead of every prompt.
pub const SYSTEM_PROMPT: &str = "You write small, correct extraction programs for bank statements. \
Reply with program source only.";

/// One text-completion endpoint.
pub trait CompletionBackend: Send + Sync {
    /// Provider key, e.g. "openai".
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// Send `prompt` and return the raw reply text.
    fn complete(&self, prompt: &str) -> SmithResult<String>;
}

/// Known backend presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Groq,
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Gemini => "gemini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Groq => "llama3-8b-8192",
            Self::Gemini => "gemini-1.5-flash",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Gemini => "GOOGLE_API_KEY",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = SmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(SmithError::config(format!("unknown model provider '{other}'"))),
        }
    }
}

/// Overrides applied on top of a provider preset.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout: Option<Duration>,
}

/// Build the backend for `provider`, reading its API key from the
/// environment.
///
/// # Errors
///
/// `SmithError::Configuration` when the key variable is unset or empty, or
/// the HTTP client cannot be built.
pub fn build_backend(
    provider: Provider,
    options: &BackendOptions,
) -> SmithResult<Box<dyn CompletionBackend>> {
    let key_env = options
        .api_key_env
        .clone()
        .unwrap_or_else(|| provider.default_api_key_env().to_string());
    let api_key = std::env::var(&key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            SmithError::config(format!(
                "{} provider needs an API key in ${}",
                provider.as_str(),
                key_env
            ))
        })?;

    let model = options
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    let base_url = options
        .base_url
        .clone()
        .unwrap_or_else(|| provider.default_base_url().to_string());
    let timeout = options.timeout.unwrap_or(DEFAULT_GENERATION_TIMEOUT);

    Ok(match provider {
        Provider::OpenAi | Provider::Groq => Box::new(OpenAiBackend::new(
            provider.as_str(),
            base_url,
            api_key,
            model,
            timeout,
        )?),
        Provider::Gemini => Box::new(GeminiBackend::new(base_url, api_key, model, timeout)?),
    })
}

/// A generator that asks a model for each candidate.
pub struct ModelGenerator {
    backend: Box<dyn CompletionBackend>,
}

impl ModelGenerator {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Shorthand for `build_backend` plus `new`.
    pub fn from_provider(provider: Provider, options: &BackendOptions) -> SmithResult<Self> {
        Ok(Self::new(build_backend(provider, options)?))
    }
}

impl Generator for ModelGenerator {
    fn strategy(&self) -> GenerationStrategy {
        GenerationStrategy::Model {
            provider: self.backend.provider().to_string(),
            model: self.backend.model().to_string(),
        }
    }

    fn generate(&self, ctx: &PromptContext) -> SmithResult<String> {
        let prompt = ctx.render();
        debug!(
            provider = self.backend.provider(),
            model = self.backend.model(),
            attempt = ctx.attempt,
            prompt_chars = prompt.len(),
            "requesting completion"
        );

        let reply = self.backend.complete(&prompt).map_err(|e| match e {
            SmithError::Generation { .. } => e,
            other => SmithError::Generation {
                reason: other.to_string(),
            },
        })?;

        let source = strip_code_fences(&reply);
        if source.trim().is_empty() {
            warn!(provider = self.backend.provider(), "model returned an empty reply");
            return Err(SmithError::Generation {
                reason: format!("{} returned an empty reply", self.backend.provider()),
            });
        }
        Ok(source)
    }
}

/// Pull program source out of a chat reply.
///
/// When the reply contains a fenced block, the first block's body is taken
/// and the language tag on the opening fence is dropped. An unterminated
/// fence runs to the end of the reply. Otherwise the trimmed reply is
/// returned as is.
pub fn strip_code_fences(reply: &str) -> String {
    let Some(open) = reply.find("```") else {
        return reply.trim().to_string();
    };
    let after_open = &reply[open + 3..];
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
    let body = &after_open[body_start..];
    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    let mut source = body.trim_end().to_string();
    source.push('\n');
    source
}

/// Shared shape of backend HTTP failures.
pub(crate) fn http_failure(provider: &str, status: u16, body: &str) -> SmithError {
    let snippet: String = body.chars().take(500).collect();
    SmithError::Generation {
        reason: format!("{provider} returned HTTP {status}: {snippet}"),
    }
}
