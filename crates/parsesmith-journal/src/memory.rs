//! In-memory implementation of `AttemptJournal`.
//!
//! `InMemoryJournal` keeps every entry in a `Vec` behind a `Mutex`. When an
//! export path is set, `finalize()` also writes the sealed log there as
//! pretty-printed JSON.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};

use parsesmith_contracts::{
    error::{SmithError, SmithResult},
    execution::AttemptRecord,
    state::{Phase, RunId},
};
use parsesmith_core::traits::AttemptJournal;

use crate::{
    chain::{hash_entry, verify_chain},
    event::{JournalEntry, JournalLog},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct JournalState {
    pub(crate) entries: Vec<JournalEntry>,
    pub(crate) sequence: u64,
    /// `this_hash` of the last entry, or `GENESIS_HASH`.
    pub(crate) last_hash: String,
    pub(crate) terminal_phase: Option<Phase>,
}

// ── Public journal ────────────────────────────────────────────────────────────

/// An append-only attempt journal backed by a SHA-256 hash chain.
pub struct InMemoryJournal {
    target: String,
    export_path: Option<PathBuf>,
    pub(crate) state: Arc<Mutex<JournalState>>,
}

impl InMemoryJournal {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            export_path: None,
            state: Arc::new(Mutex::new(JournalState {
                entries: Vec::new(),
                sequence: 0,
                last_hash: JournalEntry::GENESIS_HASH.to_string(),
                terminal_phase: None,
            })),
        }
    }

    /// Write the sealed log to `path` on `finalize()`.
    pub fn with_export_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(path.into());
        self
    }

    fn lock(&self) -> SmithResult<std::sync::MutexGuard<'_, JournalState>> {
        self.state.lock().map_err(|e| SmithError::Journal {
            reason: format!("journal state lock poisoned: {e}"),
        })
    }

    /// A sealed copy of everything recorded so far.
    pub fn export_log(&self) -> SmithResult<JournalLog> {
        let state = self.lock()?;
        Ok(JournalLog {
            target: self.target.clone(),
            entries: state.entries.clone(),
            terminal_phase: state.terminal_phase,
            finalized_at: Utc::now(),
            terminal_hash: state
                .entries
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
        })
    }

    /// Whether the in-memory chain is intact.
    pub fn verify_integrity(&self) -> bool {
        match self.state.lock() {
            Ok(state) => verify_chain(&state.entries),
            Err(_) => false,
        }
    }

    /// Write the sealed log to `path` as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> SmithResult<()> {
        let log = self.export_log()?;
        let json = serde_json::to_string_pretty(&log).map_err(|e| SmithError::Journal {
            reason: format!("failed to serialize journal: {e}"),
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SmithError::Journal {
                    reason: format!("failed to create '{}': {}", parent.display(), e),
                })?;
            }
        }
        std::fs::write(path, json).map_err(|e| SmithError::Journal {
            reason: format!("failed to write journal '{}': {}", path.display(), e),
        })?;

        debug!(path = %path.display(), entries = log.entries.len(), "journal exported");
        Ok(())
    }
}

// ── AttemptJournal impl ───────────────────────────────────────────────────────

impl AttemptJournal for InMemoryJournal {
    fn record(&self, run_id: &RunId, record: &AttemptRecord) -> SmithResult<()> {
        let mut state = self.lock()?;

        let run_id = run_id.to_string();
        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash =
            hash_entry(&run_id, sequence, record, &prev_hash).map_err(|e| SmithError::Journal {
                reason: format!("failed to hash attempt record: {e}"),
            })?;

        state.entries.push(JournalEntry {
            sequence,
            run_id,
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;

        Ok(())
    }

    fn finalize(&self, run_id: &RunId, phase: Phase) -> SmithResult<()> {
        {
            let mut state = self.lock()?;
            state.terminal_phase = Some(phase);

            info!(
                run_id = %run_id,
                target = %self.target,
                phase = %phase,
                entry_count = state.entries.len(),
                terminal_hash = %state.last_hash,
                "attempt journal finalized"
            );
        }

        match &self.export_path {
            Some(path) => self.write_json(path),
            None => Ok(()),
        }
    }
}
