//! Scenario 3: Exhaustion
//!
//! The reference asks for a `Reference No` column the statement never
//! prints. Every template recipe splits the description to fill it, the
//! validator rejects the first such cell, and the run stops at the attempt
//! ceiling:
//!   1. Attempts 1..=3 each end in a cell mismatch
//!   2. The run ends `Exhausted` with the last diagnostic in full
//!   3. `into_result()` turns the outcome into a validation error

use std::sync::Arc;

use parsesmith_contracts::{
    error::{SmithError, SmithResult},
    state::Phase,
};
use parsesmith_generate::TemplateGenerator;
use parsesmith_journal::InMemoryJournal;

use crate::mock_data::{write_fixture, ACME_UNSATISFIABLE_CSV, TARGET};

use super::{build_loop, report};

/// Run Scenario 3: Exhaustion.
pub fn run_scenario() -> SmithResult<()> {
    println!("=== Scenario 3: Exhaustion ===");
    println!();

    let dir = tempfile::tempdir()
        .map_err(|e| SmithError::config(format!("failed to create scratch directory: {e}")))?;
    let target = write_fixture(dir.path(), ACME_UNSATISFIABLE_CSV, "toml")?;

    println!("  Target:    {}", target.name);
    println!("  Reference: includes 'Reference No', absent from the statement");
    println!();

    let journal = Arc::new(InMemoryJournal::new(TARGET));
    let agent = build_loop(Box::new(TemplateGenerator::new()), &journal);
    let outcome = agent.run(target)?;

    let integrity_ok = report(&outcome, &journal)?;
    let entries = journal.export_log()?.entries.len();
    let exhausted = outcome.state.phase == Phase::Exhausted && outcome.attempts() == 3;

    match outcome.into_result() {
        Err(SmithError::Validation { diagnostic }) if exhausted && entries == 3 && integrity_ok => {
            println!("  Surfaced error:         [{}] {}", diagnostic.label(), diagnostic);
        }
        other => {
            return Err(SmithError::Execution {
                reason: format!(
                    "exhaustion scenario expected a validation error after 3 attempts, got {:?}",
                    other.map(|c| c.attempt)
                ),
            });
        }
    }
    println!();

    println!("  Scenario 3 complete.");
    println!();
    Ok(())
}
