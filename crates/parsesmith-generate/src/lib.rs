//! # parsesmith-generate
//!
//! Candidate generation strategies. Both implement
//! [`parsesmith_core::traits::Generator`] and are interchangeable:
//!
//! - [`template::TemplateGenerator`] renders a recipe from the schema alone.
//! - [`model::ModelGenerator`] asks an HTTP model backend
//!   ([`openai::OpenAiBackend`] for OpenAI and Groq,
//!   [`gemini::GeminiBackend`] for Gemini).

pub mod gemini;
pub mod model;
pub mod openai;
pub mod template;

pub use model::{build_backend, BackendOptions, ModelGenerator, Provider};
pub use template::TemplateGenerator;
