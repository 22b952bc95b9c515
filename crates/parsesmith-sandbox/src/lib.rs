//! # parsesmith-sandbox
//!
//! Candidate execution for the parsesmith agent loop.
//!
//! Two [`parsesmith_core::traits::SandboxRunner`] implementations:
//!
//! - [`runner::RecipeRunner`] interprets TOML extraction recipes in-process
//!   on a bounded worker thread.
//! - [`command::CommandRunner`] runs script candidates through an external
//!   interpreter and reads CSV from their stdout.
//!
//! Plus the [`extract`] module, which turns sample documents into text.

pub mod command;
pub mod extract;
pub mod recipe;
pub mod runner;

pub use command::CommandRunner;
pub use extract::{AutoExtractor, CommandExtractor, PlainTextExtractor};
pub use runner::RecipeRunner;
