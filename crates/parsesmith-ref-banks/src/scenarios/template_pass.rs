//! Scenario 1: Template pass
//!
//! The schema-driven template recipe is enough for a cleanly aligned
//! statement:
//!   1. Init loads the statement text and infers the reference schema
//!   2. The template generator renders one capture group per column
//!   3. The recipe runner extracts six rows
//!   4. The validator finds no divergence → Success on attempt 1
//!   5. The accepted recipe is persisted and the journal chain verified

use std::sync::Arc;

use parsesmith_contracts::error::{SmithError, SmithResult};
use parsesmith_generate::TemplateGenerator;
use parsesmith_journal::InMemoryJournal;

use crate::mock_data::{write_fixture, ACME_REFERENCE_CSV, TARGET};

use super::{build_loop, report};

/// Run Scenario 1: Template pass.
pub fn run_scenario() -> SmithResult<()> {
    println!("=== Scenario 1: Template pass ===");
    println!();

    let dir = tempfile::tempdir()
        .map_err(|e| SmithError::config(format!("failed to create scratch directory: {e}")))?;
    let target = write_fixture(dir.path(), ACME_REFERENCE_CSV, "toml")?;
    let parser_path = target.parser_path.clone();

    println!("  Target:    {}", target.name);
    println!("  Generator: template (no network)");
    println!("  Runner:    recipe");
    println!();

    let journal = Arc::new(InMemoryJournal::new(TARGET));
    let agent = build_loop(Box::new(TemplateGenerator::new()), &journal);
    let outcome = agent.run(target)?;

    let integrity_ok = report(&outcome, &journal)?;
    println!(
        "  Parser persisted:       {}",
        if parser_path.is_file() { "yes" } else { "no" }
    );
    println!();

    if !outcome.passed() || outcome.attempts() != 1 || !integrity_ok {
        return Err(SmithError::Execution {
            reason: format!(
                "template scenario expected a first-attempt pass, got {} after {} attempt(s)",
                outcome.state.phase,
                outcome.attempts()
            ),
        });
    }

    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}
