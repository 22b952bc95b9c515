//! The parsesmith agent loop: bounded generate → execute → validate → repair.
//!
//! ```text
//!   Init → Generating → Running → Validating → Success
//!              ↑                       │
//!              └────── Retrying ←──────┤ (attempt < max)
//!                                      └→ Exhausted (attempt == max)
//! ```
//!
//! The state is an explicit `AgentState` value. Each transition function
//! takes it by value and returns the next `Step`; nothing outside this
//! module mutates it. Attempts are strictly sequential because every prompt
//! after the first carries the previous attempt's diagnostic.

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use parsesmith_contracts::{
    candidate::{CandidateProgram, ProgramDialect},
    error::{SmithError, SmithResult},
    execution::{AttemptRecord, RunOutcome},
    state::{AgentState, Phase},
    table::{Column, TabularResult},
    target::Target,
    verdict::{Diagnostic, Verdict},
};

use crate::{
    prompt::{excerpt, PromptContext, REFERENCE_PREVIEW_ROWS},
    reference::{load_reference, preview_csv},
    traits::{AttemptJournal, DocumentExtractor, Execution, Generator, SandboxRunner, Validator},
};

/// Default attempt ceiling.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default bound on the sample excerpt placed in prompts, in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 4000;

/// Tunables for one loop instance.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub max_attempts: u32,
    pub excerpt_chars: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// Inputs loaded once in `Init` and read by every later state.
struct RunInputs {
    sample_excerpt: String,
    reference: TabularResult,
    reference_preview: String,
    schema: Vec<Column>,
    dialect: ProgramDialect,
}

/// The next transition to take.
enum Step {
    Generate(AgentState),
    Run(AgentState),
    Validate(AgentState, Execution),
    Decide(AgentState, Verdict),
    Done(AgentState),
}

/// Drives one target through the bounded repair loop.
///
/// Construct one loop per target; a loop holds no per-run state, so the same
/// instance may also be reused for sequential runs.
pub struct AgentLoop {
    generator: Box<dyn Generator>,
    runner: Box<dyn SandboxRunner>,
    validator: Box<dyn Validator>,
    extractor: Box<dyn DocumentExtractor>,
    journal: Box<dyn AttemptJournal>,
    config: LoopConfig,
}

impl AgentLoop {
    pub fn new(
        generator: Box<dyn Generator>,
        runner: Box<dyn SandboxRunner>,
        validator: Box<dyn Validator>,
        extractor: Box<dyn DocumentExtractor>,
        journal: Box<dyn AttemptJournal>,
        config: LoopConfig,
    ) -> Self {
        Self {
            generator,
            runner,
            validator,
            extractor,
            journal,
            config,
        }
    }

    /// Run the loop for `target` until it passes or the attempt ceiling is hit.
    ///
    /// # Errors
    ///
    /// Only `SmithError::Configuration` is returned, for problems found in
    /// `Init` (missing inputs, unreadable reference, zero attempt ceiling).
    /// Generation and execution failures are consumed attempts, and an
    /// exhausted run is an `Ok` outcome carrying a `Fail` verdict.
    pub fn run(&self, target: Target) -> SmithResult<RunOutcome> {
        if self.config.max_attempts == 0 {
            return Err(SmithError::config("max_attempts must be at least 1"));
        }

        let state = AgentState::new(target, self.config.max_attempts);
        info!(
            run_id = %state.run_id,
            target = %state.target.name,
            max_attempts = state.max_attempts,
            generator = %self.generator.strategy(),
            "agent loop starting"
        );

        // ── Init ─────────────────────────────────────────────────────────────
        let inputs = self.init(&state.target)?;

        let mut step = Step::Generate(state);
        loop {
            step = match step {
                Step::Generate(state) => self.generating(state, &inputs),
                Step::Run(state) => self.running(state),
                Step::Validate(state, execution) => self.validating(state, execution, &inputs),
                Step::Decide(state, verdict) => self.decide(state, verdict),
                Step::Done(state) => {
                    self.finish(&state);
                    return Ok(RunOutcome { state });
                }
            };
        }
    }

    /// Re-run the parser already persisted for `target` and validate it.
    ///
    /// Uses the same `Init` checks as `run`; a missing parser file is a
    /// configuration error. Execution faults come back as a `Fail` verdict.
    pub fn check_persisted(&self, target: &Target) -> SmithResult<Verdict> {
        let inputs = self.init(target)?;
        let source = std::fs::read_to_string(&target.parser_path).map_err(|e| {
            SmithError::config(format!(
                "failed to read persisted parser '{}': {}",
                target.parser_path.display(),
                e
            ))
        })?;

        let verdict = match self.runner.execute(&source, &target.sample_path) {
            Ok(produced) => self.validator.compare(&produced, &inputs.reference),
            Err(failure) => Verdict::Fail(Diagnostic::raised(failure.message)),
        };
        info!(target = %target.name, verdict = %verdict, "persisted parser checked");
        Ok(verdict)
    }

    // ── Init ─────────────────────────────────────────────────────────────────

    fn init(&self, target: &Target) -> SmithResult<RunInputs> {
        require_file(&target.sample_path, "sample input")?;
        require_file(&target.reference_path, "reference output")?;

        let text = self.extractor.extract(&target.sample_path).map_err(|e| {
            SmithError::config(format!(
                "failed to extract sample '{}': {}",
                target.sample_path.display(),
                e
            ))
        })?;

        let reference = load_reference(&target.reference_path, &target.column_types)?;
        let schema = reference.columns.clone();

        debug!(
            target = %target.name,
            sample_chars = text.chars().count(),
            columns = schema.len(),
            reference_rows = reference.row_count(),
            "inputs loaded"
        );

        Ok(RunInputs {
            sample_excerpt: excerpt(&text, self.config.excerpt_chars),
            reference_preview: preview_csv(&reference, REFERENCE_PREVIEW_ROWS),
            reference,
            schema,
            dialect: self.runner.dialect(),
        })
    }

    // ── Generating ───────────────────────────────────────────────────────────

    fn generating(&self, mut state: AgentState, inputs: &RunInputs) -> Step {
        state.phase = Phase::Generating;
        state.attempt += 1;
        transition(&state);

        let ctx = PromptContext {
            target: state.target.name.clone(),
            schema: inputs.schema.clone(),
            reference_preview: inputs.reference_preview.clone(),
            reference_rows: inputs.reference.row_count(),
            sample_excerpt: inputs.sample_excerpt.clone(),
            diagnostic: state.diagnostic.clone(),
            previous_source: state.candidate.as_ref().map(|c| c.source.clone()),
            attempt: state.attempt,
            dialect: inputs.dialect.clone(),
        };

        let failure = match self.generator.generate(&ctx) {
            Ok(source) if !source.trim().is_empty() => {
                state.candidate = Some(CandidateProgram {
                    source,
                    attempt: state.attempt,
                    strategy: self.generator.strategy(),
                });
                return Step::Run(state);
            }
            Ok(_) => "generator returned empty source".to_string(),
            Err(SmithError::Generation { reason }) => reason,
            Err(other) => other.to_string(),
        };

        warn!(
            run_id = %state.run_id,
            attempt = state.attempt,
            reason = %failure,
            "generation failed"
        );
        Step::Decide(state, Verdict::Fail(Diagnostic::generation(failure)))
    }

    // ── Running ──────────────────────────────────────────────────────────────

    fn running(&self, mut state: AgentState) -> Step {
        state.phase = Phase::Running;
        transition(&state);

        let Some(candidate) = state.candidate.as_ref() else {
            return Step::Decide(
                state,
                Verdict::Fail(Diagnostic::raised("no candidate to run")),
            );
        };

        if let Err(e) = persist(&state.target.parser_path, &candidate.source) {
            warn!(
                run_id = %state.run_id,
                path = %state.target.parser_path.display(),
                error = %e,
                "could not persist candidate"
            );
            let message = format!(
                "could not persist candidate to '{}': {}",
                state.target.parser_path.display(),
                e
            );
            return Step::Decide(state, Verdict::Fail(Diagnostic::raised(message)));
        }

        debug!(
            run_id = %state.run_id,
            parser = %state.target.parser_path.display(),
            "executing candidate"
        );
        let execution = self.runner.execute(&candidate.source, &state.target.sample_path);
        Step::Validate(state, execution)
    }

    // ── Validating ───────────────────────────────────────────────────────────

    fn validating(&self, mut state: AgentState, execution: Execution, inputs: &RunInputs) -> Step {
        state.phase = Phase::Validating;
        transition(&state);

        let verdict = match execution {
            Err(failure) => {
                warn!(
                    run_id = %state.run_id,
                    attempt = state.attempt,
                    failure = %failure,
                    "candidate execution failed"
                );
                Verdict::Fail(Diagnostic::raised(failure.message))
            }
            Ok(produced) => {
                debug!(
                    run_id = %state.run_id,
                    attempt = state.attempt,
                    produced_rows = produced.row_count(),
                    "comparing against reference"
                );
                self.validator.compare(&produced, &inputs.reference)
            }
        };

        Step::Decide(state, verdict)
    }

    // ── Success | Retrying | Exhausted ───────────────────────────────────────

    fn decide(&self, mut state: AgentState, verdict: Verdict) -> Step {
        let record = AttemptRecord {
            attempt: state.attempt,
            decided_in: state.phase,
            candidate: match state.phase {
                Phase::Generating => None,
                _ => state.candidate.clone(),
            },
            verdict: verdict.clone(),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.journal.record(&state.run_id, &record) {
            warn!(run_id = %state.run_id, error = %e, "attempt journal write failed");
        }

        match verdict {
            Verdict::Pass => {
                state.phase = Phase::Success;
                state.diagnostic = None;
                state.verdict = Some(Verdict::Pass);
                transition(&state);
                Step::Done(state)
            }
            Verdict::Fail(diagnostic) if state.attempt < state.max_attempts => {
                warn!(
                    run_id = %state.run_id,
                    attempt = state.attempt,
                    remaining = state.attempts_remaining(),
                    diagnostic = %diagnostic,
                    "attempt failed, retrying"
                );
                state.phase = Phase::Retrying;
                state.diagnostic = Some(diagnostic);
                transition(&state);
                Step::Generate(state)
            }
            Verdict::Fail(diagnostic) => {
                state.phase = Phase::Exhausted;
                state.diagnostic = Some(diagnostic.clone());
                state.verdict = Some(Verdict::Fail(diagnostic));
                transition(&state);
                Step::Done(state)
            }
        }
    }

    fn finish(&self, state: &AgentState) {
        if let Err(e) = self.journal.finalize(&state.run_id, state.phase) {
            warn!(run_id = %state.run_id, error = %e, "attempt journal finalize failed");
        }

        match state.phase {
            Phase::Success => info!(
                run_id = %state.run_id,
                target = %state.target.name,
                attempts = state.attempt,
                "candidate passed validation"
            ),
            _ => warn!(
                run_id = %state.run_id,
                target = %state.target.name,
                attempts = state.attempt,
                diagnostic = %state
                    .diagnostic
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                "attempt ceiling reached"
            ),
        }
    }
}

/// Emit the per-transition event every state change carries.
fn transition(state: &AgentState) {
    debug!(
        run_id = %state.run_id,
        target = %state.target.name,
        attempt = state.attempt,
        phase = %state.phase,
        "phase transition"
    );
}

fn require_file(path: &Path, what: &str) -> SmithResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SmithError::config(format!(
            "{} not found: {}",
            what,
            path.display()
        )))
    }
}

/// Overwrite the target's parser file with `source`, creating parent dirs.
fn persist(path: &Path, source: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, source)
}

// ── Tests ────────────────────────────────────────────────────────────────────
