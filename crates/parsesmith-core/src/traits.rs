//! Core trait definitions for the parsesmith agent loop.
//!
//! These traits are the seams between the loop and its collaborators:
//!
//! - `Generator`: produces candidate source (model- or template-backed)
//! - `SandboxRunner`: executes a candidate in isolation
//! - `Validator`: compares a produced table with the reference
//! - `DocumentExtractor`: turns a sample document into text
//! - `AttemptJournal`: records every consumed attempt
//!
//! The `AgentLoop` wires them together in a fixed order and owns all retry
//! decisions; implementations never decide whether to try again.

use std::path::Path;

use parsesmith_contracts::{
    candidate::{GenerationStrategy, ProgramDialect},
    error::SmithResult,
    execution::{AttemptRecord, CapturedFailure},
    state::{Phase, RunId},
    table::TabularResult,
    verdict::Verdict,
};

use crate::prompt::PromptContext;

/// What a sandbox run hands back: a table, or a captured failure.
pub type Execution = Result<TabularResult, CapturedFailure>;

/// A code-generation strategy.
///
/// Implementations must return `Err` (usually `SmithError::Generation`) for
/// any failure to obtain source text, never panic. The loop counts such a
/// failure as a consumed attempt.
pub trait Generator: Send + Sync {
    /// Provenance stamped on every candidate this generator produces.
    fn strategy(&self) -> GenerationStrategy;

    /// Produce program source for the given context.
    ///
    /// Blocking calls to external backends must be bounded by an explicit
    /// timeout inside the implementation.
    fn generate(&self, ctx: &PromptContext) -> SmithResult<String>;
}

/// Executes one candidate program against a sample document.
///
/// Each call is isolated: nothing compiled or loaded for one candidate may be
/// reused by the next. Every fault, including panics and timeouts, must come
/// back as `Err(CapturedFailure)`.
pub trait SandboxRunner: Send + Sync {
    /// The program language this runner accepts.
    fn dialect(&self) -> ProgramDialect;

    /// Run `source`'s extraction entry point against the document at `sample`.
    fn execute(&self, source: &str, sample: &Path) -> Execution;
}

/// Decides whether a produced table matches the reference.
pub trait Validator: Send + Sync {
    /// Compare `produced` against `reference`, stopping at the first divergence.
    fn compare(&self, produced: &TabularResult, reference: &TabularResult) -> Verdict;
}

/// Turns a sample document into text.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> SmithResult<String>;
}

/// The append-only record of a run's attempts.
///
/// The loop treats journal errors as non-fatal: they are logged and the run
/// continues.
pub trait AttemptJournal: Send + Sync {
    /// Append one attempt record.
    fn record(&self, run_id: &RunId, record: &AttemptRecord) -> SmithResult<()>;

    /// Mark the run as finished in `phase` (`Success` or `Exhausted`).
    fn finalize(&self, run_id: &RunId, phase: Phase) -> SmithResult<()>;
}

/// A journal that keeps nothing. Useful for one-off checks and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl AttemptJournal for NullJournal {
    fn record(&self, _run_id: &RunId, _record: &AttemptRecord) -> SmithResult<()> {
        Ok(())
    }

    fn finalize(&self, _run_id: &RunId, _phase: Phase) -> SmithResult<()> {
        Ok(())
    }
}
