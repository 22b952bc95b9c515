//! Per-attempt records and the terminal outcome of a run.
//!
//! `AttemptRecord` is what the attempt journal stores, one per consumed
//! attempt. `RunOutcome` is what `AgentLoop::run` hands back to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    candidate::CandidateProgram,
    error::{SmithError, SmithResult},
    state::{AgentState, Phase},
    verdict::{Diagnostic, Verdict},
};

/// An immutable record of one consumed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    /// The phase in which the attempt's verdict was decided.
    pub decided_in: Phase,
    /// The candidate under test, absent when generation failed.
    pub candidate: Option<CandidateProgram>,
    pub verdict: Verdict,
    /// Wall-clock time the record was created (UTC).
    pub timestamp: DateTime<Utc>,
}

/// The terminal result of one run of the loop.
///
/// Exhaustion is a normal outcome, not an error: callers inspect
/// `verdict()` or convert with `into_result()`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: AgentState,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.state.phase == Phase::Success
    }

    /// The terminal verdict. A terminal state always carries one.
    pub fn verdict(&self) -> Verdict {
        self.state
            .verdict
            .clone()
            .unwrap_or_else(|| Verdict::Fail(Diagnostic::raised("run ended without a verdict")))
    }

    pub fn candidate(&self) -> Option<&CandidateProgram> {
        self.state.candidate.as_ref()
    }

    /// Attempts consumed by the run.
    pub fn attempts(&self) -> u32 {
        self.state.attempt
    }

    /// Convert into the passing candidate, or the error matching the last
    /// diagnostic with its full payload.
    pub fn into_result(self) -> SmithResult<CandidateProgram> {
        match self.verdict() {
            Verdict::Pass => self.state.candidate.ok_or_else(|| SmithError::Execution {
                reason: "run passed without a candidate".to_string(),
            }),
            Verdict::Fail(diagnostic) => Err(match diagnostic {
                Diagnostic::Generation { message } => SmithError::Generation { reason: message },
                Diagnostic::Raised { message } => SmithError::Execution { reason: message },
                other => SmithError::Validation { diagnostic: other },
            }),
        }
    }
}

/// A failure captured while running a candidate program.
///
/// Runners never propagate candidate faults; they describe them here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFailure {
    pub message: String,
}

impl CapturedFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CapturedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
