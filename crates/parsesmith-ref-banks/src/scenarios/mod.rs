//! Reference bank-statement scenarios.
//!
//! Each scenario writes the ACME fixture into a temporary directory, wires a
//! real agent loop (recipe runner, table validator, hash-chained journal) and
//! demonstrates one way a run can end.

pub mod exhaustion;
pub mod guided_repair;
pub mod template_pass;

use std::sync::Arc;

use parsesmith_contracts::{
    error::SmithResult,
    execution::{AttemptRecord, RunOutcome},
    state::{Phase, RunId},
};
use parsesmith_core::{
    traits::{AttemptJournal, Generator},
    AgentLoop, LoopConfig,
};
use parsesmith_journal::InMemoryJournal;
use parsesmith_sandbox::{PlainTextExtractor, RecipeRunner};
use parsesmith_verify::TableValidator;

// ── Arc-wrapped journal helper ───────────────────────────────────────────────

/// Lets an `Arc<InMemoryJournal>` be handed to the loop as
/// `Box<dyn AttemptJournal>` while the scenario keeps a handle to inspect it.
struct ArcJournal(Arc<InMemoryJournal>);

impl AttemptJournal for ArcJournal {
    fn record(&self, run_id: &RunId, record: &AttemptRecord) -> SmithResult<()> {
        self.0.record(run_id, record)
    }

    fn finalize(&self, run_id: &RunId, phase: Phase) -> SmithResult<()> {
        self.0.finalize(run_id, phase)
    }
}

/// A loop over the recipe dialect with plain-text extraction.
fn build_loop(generator: Box<dyn Generator>, journal: &Arc<InMemoryJournal>) -> AgentLoop {
    AgentLoop::new(
        generator,
        Box::new(RecipeRunner::new(Arc::new(PlainTextExtractor))),
        Box::new(TableValidator::new()),
        Box::new(PlainTextExtractor),
        Box::new(ArcJournal(Arc::clone(journal))),
        LoopConfig::default(),
    )
}

/// Print the outcome and the journal's chain status.
fn report(outcome: &RunOutcome, journal: &InMemoryJournal) -> SmithResult<bool> {
    println!("  Final phase:            {}", outcome.state.phase);
    println!("  Attempts consumed:      {}", outcome.attempts());
    println!("  Verdict:                {}", outcome.verdict());

    let integrity_ok = journal.verify_integrity();
    let log = journal.export_log()?;
    println!(
        "  Journal integrity:      {} ({} entr{} in chain)",
        if integrity_ok { "VERIFIED" } else { "FAILED" },
        log.entries.len(),
        if log.entries.len() == 1 { "y" } else { "ies" }
    );
    Ok(integrity_ok)
}
