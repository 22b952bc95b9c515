//! Run identity and the state threaded through the agent loop.
//!
//! `AgentState` is an explicit value: each transition of the loop takes it
//! by value and hands back the next one. Nothing else mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    candidate::CandidateProgram,
    target::Target,
    verdict::{Diagnostic, Verdict},
};

/// Unique identifier for a single run of the loop over one target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The states of the agent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Generating,
    Running,
    Validating,
    Retrying,
    Success,
    Exhausted,
}

impl Phase {
    /// `Success` and `Exhausted` end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Exhausted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Generating => "generating",
            Self::Running => "running",
            Self::Validating => "validating",
            Self::Retrying => "retrying",
            Self::Success => "success",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the loop carries between transitions of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub run_id: RunId,
    pub target: Target,
    pub phase: Phase,
    /// Attempts consumed so far. Zero until the first generation starts.
    pub attempt: u32,
    /// Attempt ceiling for this run.
    pub max_attempts: u32,
    /// The current (or last) candidate. `None` until a generation succeeds.
    pub candidate: Option<CandidateProgram>,
    /// Diagnostic of the most recent failed attempt.
    pub diagnostic: Option<Diagnostic>,
    /// Set once the run reaches a terminal phase.
    pub verdict: Option<Verdict>,
}

impl AgentState {
    /// A fresh state in `Init` with attempt 0 and no diagnostic.
    pub fn new(target: Target, max_attempts: u32) -> Self {
        Self {
            run_id: RunId::new(),
            target,
            phase: Phase::Init,
            attempt: 0,
            max_attempts,
            candidate: None,
            diagnostic: None,
            verdict: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempt)
    }
}
