//! # parsesmith-core
//!
//! The bounded generate → execute → validate → repair loop.
//!
//! This crate provides:
//! - The collaborator traits (`Generator`, `SandboxRunner`, `Validator`,
//!   `DocumentExtractor`, `AttemptJournal`)
//! - Prompt construction and reference loading
//! - The `AgentLoop` that drives one target to `Success` or `Exhausted`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use parsesmith_core::{AgentLoop, LoopConfig};
//! ```

pub mod agent_loop;
pub mod prompt;
pub mod reference;
pub mod traits;

pub use agent_loop::{AgentLoop, LoopConfig};
