//! Candidate programs and their provenance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which generation strategy produced a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum GenerationStrategy {
    /// Deterministic template substitution from the target schema.
    Template,
    /// A model-backed backend (`provider` is e.g. "openai", "groq", "gemini").
    Model { provider: String, model: String },
}

impl fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => f.write_str("template"),
            Self::Model { provider, model } => write!(f, "{provider}:{model}"),
        }
    }
}

/// One generated attempt at an extraction routine for a target.
///
/// Only the most recent candidate is kept around; it is fed back into the
/// next prompt when it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProgram {
    pub source: String,
    /// The attempt (1-based) that produced this candidate.
    pub attempt: u32,
    pub strategy: GenerationStrategy,
}

/// The language a sandbox runner expects candidate programs to be written in.
///
/// Runners advertise their dialect so prompts can carry authoring
/// instructions and persisted parser files get the right extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDialect {
    /// Short identifier, e.g. "recipe" or "python".
    pub name: String,
    /// File extension for the persisted parser, without the dot.
    pub extension: String,
    /// Authoring rules rendered verbatim into generation prompts.
    pub instructions: String,
}
