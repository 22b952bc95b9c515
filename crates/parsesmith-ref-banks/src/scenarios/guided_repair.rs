//! Scenario 2: Guided repair
//!
//! Shows the diagnostic feedback path:
//!   1. The first candidate only accepts unsigned amounts, so every debit
//!      line is skipped and the run produces 2 of 6 rows
//!   2. The validator reports the row-count mismatch
//!   3. The mismatch and the failing source go back into the next prompt
//!   4. The second candidate accepts signed amounts → Success on attempt 2

use std::sync::{Arc, Mutex};

use parsesmith_contracts::{
    candidate::GenerationStrategy,
    error::{SmithError, SmithResult},
    verdict::Diagnostic,
};
use parsesmith_core::{prompt::PromptContext, traits::Generator};
use parsesmith_journal::InMemoryJournal;

use crate::mock_data::{write_fixture, ACME_REFERENCE_CSV, TARGET};

use super::{build_loop, report};

const UNSIGNED_AMOUNT: &str = r"([\d,]+\.\d{2})";
const SIGNED_AMOUNT: &str = r"(-?[\d,]+\.\d{2})";

// ── Generator implementation ─────────────────────────────────────────────────

/// A stand-in for a model that repairs its recipe once it is shown a
/// diagnostic. Remembers every diagnostic it was given.
pub struct RepairingGenerator {
    pub seen: Arc<Mutex<Vec<Diagnostic>>>,
}

impl RepairingGenerator {
    fn recipe(amount_group: &str) -> String {
        format!(
            r#"entry = "parse"
row_pattern = '^(\d{{2}}-\d{{2}}-\d{{4}})\s+(.+?)\s+{amount_group}\s+([\d,]+\.\d{{2}})$'
start_after = '^Date\s+Description'
stop_at = '^Closing balance'

[[columns]]
name = "Date"
kind = "date"
date_format = "%d-%m-%Y"

[[columns]]
name = "Description"
kind = "text"

[[columns]]
name = "Amount"
kind = "amount"

[[columns]]
name = "Balance"
kind = "amount"
"#
        )
    }
}

impl Generator for RepairingGenerator {
    fn strategy(&self) -> GenerationStrategy {
        GenerationStrategy::Model {
            provider: "scripted".to_string(),
            model: "repairing".to_string(),
        }
    }

    fn generate(&self, ctx: &PromptContext) -> SmithResult<String> {
        match &ctx.diagnostic {
            None => Ok(Self::recipe(UNSIGNED_AMOUNT)),
            Some(diagnostic) => {
                if let Ok(mut seen) = self.seen.lock() {
                    seen.push(diagnostic.clone());
                }
                Ok(Self::recipe(SIGNED_AMOUNT))
            }
        }
    }
}

// ── Scenario runner ──────────────────────────────────────────────────────────

/// Run Scenario 2: Guided repair.
pub fn run_scenario() -> SmithResult<()> {
    println!("=== Scenario 2: Guided repair ===");
    println!();

    let dir = tempfile::tempdir()
        .map_err(|e| SmithError::config(format!("failed to create scratch directory: {e}")))?;
    let target = write_fixture(dir.path(), ACME_REFERENCE_CSV, "toml")?;

    println!("  Target:    {}", target.name);
    println!("  Generator: scripted (unsigned amounts first, repaired on feedback)");
    println!();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let generator = RepairingGenerator {
        seen: Arc::clone(&seen),
    };
    let journal = Arc::new(InMemoryJournal::new(TARGET));
    let agent = build_loop(Box::new(generator), &journal);
    let outcome = agent.run(target)?;

    let feedback = seen
        .lock()
        .map(|s| s.clone())
        .map_err(|e| SmithError::Execution {
            reason: format!("diagnostic log poisoned: {e}"),
        })?;
    for diagnostic in &feedback {
        println!("  Feedback given:         [{}] {}", diagnostic.label(), diagnostic);
    }

    let integrity_ok = report(&outcome, &journal)?;
    println!();

    let repaired_from_row_count = feedback
        .first()
        .is_some_and(|d| d.label() == "row-count-mismatch");

    if !outcome.passed() || outcome.attempts() != 2 || !repaired_from_row_count || !integrity_ok {
        return Err(SmithError::Execution {
            reason: format!(
                "guided repair expected a second-attempt pass after a row-count mismatch, got {} after {} attempt(s)",
                outcome.state.phase,
                outcome.attempts()
            ),
        });
    }

    println!("  Scenario 2 complete.");
    println!();
    Ok(())
}
