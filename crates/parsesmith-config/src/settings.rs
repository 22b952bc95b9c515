//! Configuration schema.
//!
//! A `SmithConfig` is deserialized from TOML. Every section is optional and
//! every field has a default, so an empty document is a valid configuration.
//!
//! Example:
//! ```toml
//! [settings]
//! max_attempts = 3
//! data_dir = "data"
//!
//! [provider]
//! kind = "groq"
//!
//! [runner]
//! kind = "recipe"
//!
//! [[targets]]
//! name = "icici"
//! column_types = { "Debit Amt" = "amount" }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use parsesmith_contracts::table::ColumnKind;

/// Loop and filesystem tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Attempt ceiling per run. Must be at least 1.
    pub max_attempts: u32,

    /// HTTP timeout for one model completion.
    pub generation_timeout_secs: u64,

    /// Hard limit on one candidate execution.
    pub execution_timeout_secs: u64,

    /// Bound on the sample excerpt placed in prompts, in characters.
    pub excerpt_chars: usize,

    /// Absolute tolerance for `amount` columns.
    pub amount_epsilon: f64,

    /// Root of the default `<target>/<target>_sample.*` layout.
    pub data_dir: PathBuf,

    /// Where generated parsers are persisted by default.
    pub parsers_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            generation_timeout_secs: 60,
            execution_timeout_secs: 30,
            excerpt_chars: 4000,
            amount_epsilon: 1e-6,
            data_dir: PathBuf::from("data"),
            parsers_dir: PathBuf::from("custom_parsers"),
        }
    }
}

/// Which generation strategy to use.
///
/// ```toml
/// kind = "template"   # no network; deterministic
/// kind = "openai"
/// kind = "groq"
/// kind = "gemini"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Template,
    Openai,
    Groq,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Openai => "openai",
            Self::Groq => "groq",
            Self::Gemini => "gemini",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "openai" => Ok(Self::Openai),
            "groq" => Ok(Self::Groq),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(format!(
                "unknown provider '{other}' (expected template, openai, groq or gemini)"
            )),
        }
    }
}

/// Generator selection plus optional overrides of the provider preset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
}

/// Which sandbox runner executes candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    /// In-process TOML extraction recipes.
    #[default]
    Recipe,
    /// Scripts run through an external interpreter.
    Command,
}

impl std::str::FromStr for RunnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recipe" => Ok(Self::Recipe),
            "command" => Ok(Self::Command),
            other => Err(format!("unknown runner '{other}' (expected recipe or command)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub kind: RunnerKind,
    /// Interpreter for `command` runners.
    pub interpreter: String,
    /// Candidate file extension for `command` runners, without the dot.
    pub extension: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            kind: RunnerKind::Recipe,
            interpreter: "python3".to_string(),
            extension: "py".to_string(),
        }
    }
}

/// One configured target. Unset paths fall back to the default layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetEntry {
    /// Unique key, e.g. `"icici"`.
    pub name: String,

    #[serde(default)]
    pub sample: Option<PathBuf>,

    #[serde(default)]
    pub reference: Option<PathBuf>,

    #[serde(default)]
    pub parser: Option<PathBuf>,

    /// Explicit kinds for reference columns, overriding inference.
    #[serde(default)]
    pub column_types: BTreeMap<String, ColumnKind>,
}

/// The top-level structure deserialized from `parsesmith.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmithConfig {
    pub settings: Settings,
    pub provider: ProviderConfig,
    pub runner: RunnerConfig,
    pub targets: Vec<TargetEntry>,
}
