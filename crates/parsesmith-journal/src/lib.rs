//! # parsesmith-journal
//!
//! Append-only, SHA-256 hash-chained attempt journal.
//!
//! ## Overview
//!
//! Every attempt the agent loop consumes is wrapped in a `JournalEntry` that
//! links to the previous entry by hash. Editing any entry, even one byte of
//! a stored candidate, breaks the chain and `verify_chain` reports it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use parsesmith_journal::InMemoryJournal;
//!
//! let journal = InMemoryJournal::new("icici").with_export_path("runs/icici.json");
//! // Pass `Box::new(journal)` to `parsesmith_core::AgentLoop::new(...)`.
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use event::{JournalEntry, JournalLog};
pub use memory::InMemoryJournal;

// ── Tests ─────────────────────────────────────────────────────────────────────
